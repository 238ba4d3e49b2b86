//! VCP Ledger — Demo CLI
//!
//! Runs end-to-end scenarios against a single in-process node backed by a
//! simulated anchoring chain.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- lifecycle --symbol MSFT --side SELL --qty 250 --price 415.10
//!   cargo run -p demo -- tamper
//!   cargo run -p demo -- outage
//!   cargo run -p demo -- --config vcp-node.toml lifecycle

mod scenarios;
mod setup;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vcp_contracts::{error::VcpResult, payload::Side};

use crate::scenarios::{lifecycle, outage, tamper};

// ── CLI definition ────────────────────────────────────────────────────────────

/// VCP — verifiable trading event ledger demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "VCP ledger demo",
    long_about = "Runs VCP ledger scenarios showing hash chaining, Merkle batching,\n\
                  external anchoring, search, and offline certificate verification."
)]
struct Cli {
    /// Node configuration TOML.  Built-in demo settings are used when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario 1: one order's lifecycle from signal to fill, anchored and certified.
    Lifecycle(OrderArgs),
    /// Scenario 2: tampered certificates fail offline verification.
    Tamper,
    /// Scenario 3: anchoring outage and chain reorganisation.
    Outage,
}

#[derive(Args)]
struct OrderArgs {
    #[arg(long, default_value = "AAPL")]
    symbol: String,
    #[arg(long, default_value = "BUY")]
    side: Side,
    #[arg(long, default_value = "100")]
    qty: String,
    #[arg(long, default_value = "150.25")]
    price: String,
}

impl From<OrderArgs> for lifecycle::Order {
    fn from(args: OrderArgs) -> Self {
        Self {
            symbol: args.symbol,
            side: args.side,
            qty: args.qty,
            price: args.price,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=info to watch batches seal and anchors confirm.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = run(cli).await;

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> VcpResult<()> {
    let config = setup::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::RunAll => {
            lifecycle::run_scenario(&config, lifecycle::Order::default()).await?;
            tamper::run_scenario(&config).await?;
            outage::run_scenario(&config).await
        }
        Command::Lifecycle(args) => lifecycle::run_scenario(&config, args.into()).await,
        Command::Tamper => tamper::run_scenario(&config).await,
        Command::Outage => outage::run_scenario(&config).await,
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("VCP — Verifiable Trading Event Ledger");
    println!("=====================================");
    println!();
    println!("Per event:");
    println!("  [1] Canonical {{header, payload}} hashed with SHA-256, linked via prev_hash");
    println!("  [2] Event hash signed with the node's Ed25519 key");
    println!("Per batch:");
    println!("  [3] Events sealed into an RFC 6962 Merkle tree");
    println!("  [4] Root anchored externally: PENDING → ANCHORED → VERIFIED");
    println!("  [5] Certificates bundle event, proof and anchor for offline checks");
    println!();
}
