#![forbid(unsafe_code)]
//! Command-line access to a SimpleChain ledger

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use simplechain::blockchain::{Block, Blockchain};
use simplechain::config::{load_config, load_config_from};
use simplechain::error::ChainError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simplechain", version, about = "Inspect and extend a hash-chained ledger")]
struct Cli {
    /// Path to a config.toml (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file, overriding database.path from the config
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the height of the tip block
    Height,
    /// Append a block; BODY is parsed as JSON, otherwise stored as a string
    Add { body: String },
    /// Print the block stored at HEIGHT
    Get { height: u64 },
    /// Check a single block's hash
    Validate { height: u64 },
    /// Check every block and every link
    ValidateChain {
        /// Print the integrity report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every block in a table
    List,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_path = cli.db.unwrap_or(config.database.path);
    let mut chain = Blockchain::open(&db_path)?;

    match cli.command {
        Command::Height => {
            println!("{}", chain.height()?);
        }
        Command::Add { body } => {
            let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
            let height = chain.add_block(Block::new(body))?;
            println!("{} {}", "✓ Block added at height".green(), height.to_string().bold());
        }
        Command::Get { height } => {
            let block = chain.get_block(height)?.ok_or(ChainError::BlockNotFound(height))?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        Command::Validate { height } => {
            if chain.validate_block(height)? {
                println!("{}", format!("✓ Block {} is valid", height).green());
            } else {
                println!("{}", format!("✗ Block {} has been tampered with", height).red().bold());
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::ValidateChain { json } => {
            let report = chain.audit_chain()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                if !report.is_valid() {
                    return Ok(ExitCode::FAILURE);
                }
            } else if report.is_valid() {
                println!(
                    "{}",
                    format!("✓ Chain is valid ({} blocks checked)", report.blocks_checked).green()
                );
            } else {
                println!("{}", "✗ Chain integrity violated".red().bold());
                for violation in &report.violations {
                    println!("  - {}", violation.to_string().yellow());
                }
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::List => print_blocks(&chain)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn print_blocks(chain: &Blockchain) -> Result<(), ChainError> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Height").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
            Cell::new("Hash").add_attribute(Attribute::Bold),
            Cell::new("Previous").add_attribute(Attribute::Bold),
            Cell::new("Body").add_attribute(Attribute::Bold),
        ]);

    let tip = chain.height()?;
    if tip >= 0 {
        for height in 0..=tip as u64 {
            let block = chain.get_block(height)?.ok_or(ChainError::BlockNotFound(height))?;
            let time = chrono::DateTime::from_timestamp(block.time as i64, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| block.time.to_string());
            table.add_row(vec![
                Cell::new(block.height),
                Cell::new(time),
                Cell::new(short_hash(&block.hash)),
                Cell::new(short_hash(&block.previous_block_hash)),
                Cell::new(block.body.to_string()),
            ]);
        }
    }

    println!("{table}");
    Ok(())
}

/// Truncates on char boundaries; tampered stores can hold any string here.
fn short_hash(hash: &str) -> String {
    if hash.chars().count() > 16 {
        format!("{}...", hash.chars().take(13).collect::<String>())
    } else if hash.is_empty() {
        "-".to_string()
    } else {
        hash.to_string()
    }
}
