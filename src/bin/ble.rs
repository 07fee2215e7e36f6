//! Lissabon BLE - find and inspect lissabon devices
//!
//! Run with: cargo run --bin lissabon-ble -- discover --duration 10

use anyhow::Context;
use clap::{Parser, Subcommand};
use lissabon_calibrate::ble::{Bluetooth, Discovery, DEFAULT_INSPECT_TIMEOUT_SECS};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Discover and inspect BLE lighting devices
#[derive(Parser, Debug)]
#[command(name = "lissabon-ble", version)]
#[command(about = "List BLE devices with their services and characteristics")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Time allowed per device for connecting and reading (s)
    #[arg(long, global = true, default_value_t = DEFAULT_INSPECT_TIMEOUT_SECS)]
    timeout: u64,

    /// Read every readable characteristic
    #[arg(long, global = true)]
    read: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan, then inspect what was found
    Discover {
        /// Scan duration (s)
        #[arg(long, default_value_t = 10)]
        duration: u64,

        /// Keep unnamed devices too
        #[arg(long)]
        all: bool,
    },
    /// Inspect devices by address
    Inspect {
        /// Device addresses
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let bluetooth = Bluetooth::new()
        .await
        .context("Failed to initialise Bluetooth")?;

    let mut discovery: Discovery = match cli.command {
        Command::Discover { duration, all } => {
            println!("+ step 1: discovery: start");
            let discovery = bluetooth
                .discover(Duration::from_secs(duration), !all)
                .await?;
            println!("+ step 1: discovery: done");
            print!("{}", discovery.dump());
            discovery
        }
        Command::Inspect { addresses } => bluetooth.lookup(&addresses).await?,
    };

    println!("+ step 2: get services: start");
    bluetooth
        .inspect_all(&mut discovery, cli.read, Duration::from_secs(cli.timeout))
        .await?;
    println!("+ step 2: get services: done");
    print!("{}", discovery.dump());
    println!("all done");
    Ok(())
}
