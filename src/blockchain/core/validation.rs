use crate::error::ChainError;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use super::chain::Blockchain;

/// A single integrity failure found while walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IntegrityViolation {
    /// The stored hash no longer matches the block's contents.
    HashMismatch {
        height: u64,
        stored: String,
        computed: String,
    },
    /// `height`'s previousBlockHash does not equal the hash of `height - 1`.
    BrokenLink {
        height: u64,
        expected: String,
        found: String,
    },
}

impl IntegrityViolation {
    pub fn height(&self) -> u64 {
        match self {
            IntegrityViolation::HashMismatch { height, .. } => *height,
            IntegrityViolation::BrokenLink { height, .. } => *height,
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegrityViolation::HashMismatch { height, stored, computed } => write!(
                f,
                "Block {} hash mismatch: stored {}, computed {}",
                height, stored, computed
            ),
            IntegrityViolation::BrokenLink { height, expected, found } => write!(
                f,
                "Block {} broken link: expected previous hash {}, found {}",
                height, expected, found
            ),
        }
    }
}

/// Outcome of a full chain walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub blocks_checked: u64,
    pub violations: Vec<IntegrityViolation>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn invalid_blocks(&self) -> Vec<u64> {
        self.violations
            .iter()
            .filter(|v| matches!(v, IntegrityViolation::HashMismatch { .. }))
            .map(IntegrityViolation::height)
            .collect()
    }

    pub fn broken_links(&self) -> Vec<u64> {
        self.violations
            .iter()
            .filter(|v| matches!(v, IntegrityViolation::BrokenLink { .. }))
            .map(IntegrityViolation::height)
            .collect()
    }
}

impl Blockchain {
    /// Walk every block from genesis to the tip, checking each self-hash and
    /// each adjacent link. Violations are collected rather than returned early
    /// so callers see every failure. A height with no stored block is an error.
    pub fn audit_chain(&self) -> Result<ChainReport, ChainError> {
        let mut report = ChainReport::default();
        let tip = self.height()?;
        if tip < 0 {
            return Ok(report);
        }

        let mut previous_hash: Option<String> = None;
        for height in 0..=tip as u64 {
            let block = self
                .get_block(height)?
                .ok_or(ChainError::BlockNotFound(height))?;
            report.blocks_checked += 1;

            let computed = block.calculate_hash()?;
            if computed != block.hash {
                let violation = IntegrityViolation::HashMismatch {
                    height,
                    stored: block.hash.clone(),
                    computed,
                };
                warn!("{}", violation);
                report.violations.push(violation);
            }

            if let Some(expected) = previous_hash.take() {
                if expected != block.previous_block_hash {
                    let violation = IntegrityViolation::BrokenLink {
                        height,
                        expected,
                        found: block.previous_block_hash.clone(),
                    };
                    warn!("{}", violation);
                    report.violations.push(violation);
                }
            }
            previous_hash = Some(block.hash);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::blockchain::{Block, Blockchain, ChainReport, IntegrityViolation, Tamper};
    use crate::error::ChainError;
    use crate::persistence::{InMemoryPersistence, LedgerStore};

    /// Genesis plus "A", "B", "C" at heights 1..=3.
    fn abc_chain() -> Blockchain {
        let mut chain = Blockchain::new().unwrap();
        for (body, expected) in [("A", 1), ("B", 2), ("C", 3)] {
            assert_eq!(chain.add_block(Block::new(body)).unwrap(), expected);
        }
        chain
    }

    #[test]
    fn test_untampered_chain_is_valid() {
        let chain = abc_chain();
        assert!(chain.validate_chain().unwrap());

        let report = chain.audit_chain().unwrap();
        assert_eq!(report.blocks_checked, 4);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_empty_store_reports_nothing() {
        let chain = Blockchain {
            store: Box::new(InMemoryPersistence::new()),
        };
        assert_eq!(chain.audit_chain().unwrap(), ChainReport::default());
    }

    #[test]
    fn test_tampered_body_fails_only_that_block() {
        let chain = abc_chain();
        let mut block = chain.get_block(2).unwrap().unwrap();
        block.body = "induced chain error".into();
        chain.modify_block(2, &block).unwrap();

        assert!(!chain.validate_block(2).unwrap());
        assert!(chain.validate_block(0).unwrap());
        assert!(chain.validate_block(1).unwrap());
        assert!(chain.validate_block(3).unwrap());
        assert!(!chain.validate_chain().unwrap());

        let report = chain.audit_chain().unwrap();
        assert_eq!(report.invalid_blocks(), vec![2]);
        assert!(report.broken_links().is_empty());
    }

    #[test]
    fn test_tampered_tip_is_detected() {
        let chain = abc_chain();
        let mut block = chain.get_block(3).unwrap().unwrap();
        block.body = "rewritten".into();
        chain.modify_block(3, &block).unwrap();

        assert_eq!(chain.audit_chain().unwrap().invalid_blocks(), vec![3]);
    }

    #[test]
    fn test_rehashed_relink_breaks_link_only() {
        let chain = abc_chain();
        let mut block = chain.get_block(3).unwrap().unwrap();
        block.previous_block_hash = "0".repeat(64);
        block.hash = block.calculate_hash().unwrap();
        chain.modify_block(3, &block).unwrap();

        assert!(chain.validate_block(3).unwrap());
        assert!(!chain.validate_chain().unwrap());

        let report = chain.audit_chain().unwrap();
        assert!(report.invalid_blocks().is_empty());
        assert_eq!(report.broken_links(), vec![3]);
        match &report.violations[0] {
            IntegrityViolation::BrokenLink { expected, found, .. } => {
                assert_eq!(expected, &chain.get_block(2).unwrap().unwrap().hash);
                assert_eq!(found, &"0".repeat(64));
            }
            other => panic!("unexpected violation {:?}", other),
        }
    }

    #[test]
    fn test_rehashed_predecessor_breaks_successor_link() {
        let chain = abc_chain();
        let mut block = chain.get_block(1).unwrap().unwrap();
        block.body = "forged".into();
        block.hash = block.calculate_hash().unwrap();
        chain.modify_block(1, &block).unwrap();

        let report = chain.audit_chain().unwrap();
        assert!(report.invalid_blocks().is_empty());
        assert_eq!(report.broken_links(), vec![2]);
    }

    #[test]
    fn test_both_failure_classes_reported() {
        let chain = abc_chain();
        let mut block = chain.get_block(1).unwrap().unwrap();
        block.body = "forged".into();
        chain.modify_block(1, &block).unwrap();

        let mut block = chain.get_block(3).unwrap().unwrap();
        block.previous_block_hash = String::new();
        block.hash = block.calculate_hash().unwrap();
        chain.modify_block(3, &block).unwrap();

        let report = chain.audit_chain().unwrap();
        assert_eq!(report.invalid_blocks(), vec![1]);
        assert_eq!(report.broken_links(), vec![3]);
    }

    #[test]
    fn test_gap_mid_chain_is_not_found() {
        let store = InMemoryPersistence::new();
        let mut chain = Blockchain::new_with_persistence(Box::new(store.clone())).unwrap();
        chain.add_block(Block::new("A")).unwrap();
        chain.add_block(Block::new("B")).unwrap();

        // Leaves three keys (0, 2, 3) so the scanned tip is 2 while height 1 is absent.
        let tip = store.get(2).unwrap().unwrap();
        store.entries.lock().unwrap().remove(&1);
        store.put(3, &tip).unwrap();

        assert_eq!(chain.validate_chain(), Err(ChainError::BlockNotFound(1)));
    }

    #[test]
    fn test_report_serializes_violation_kind() {
        let chain = abc_chain();
        let mut block = chain.get_block(2).unwrap().unwrap();
        block.body = "induced chain error".into();
        chain.modify_block(2, &block).unwrap();

        let json = serde_json::to_value(chain.audit_chain().unwrap()).unwrap();
        assert_eq!(json["blocks_checked"], 4);
        assert_eq!(json["violations"][0]["HashMismatch"]["height"], 2);
    }

    #[test]
    fn test_violation_display_names_height() {
        let violation = IntegrityViolation::BrokenLink {
            height: 4,
            expected: "aa".to_string(),
            found: "bb".to_string(),
        };
        assert_eq!(
            violation.to_string(),
            "Block 4 broken link: expected previous hash aa, found bb"
        );
    }
}
