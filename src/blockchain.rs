// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// block linkage, integrity validation and the test-only tamper path.

pub mod core;
pub use self::core::*;
