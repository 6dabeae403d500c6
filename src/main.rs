//! Card Exchange Engine CLI
//!
//! Command-line interface for replaying card exchange operation logs.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > balances.csv
//! cargo run -- --expiration-hours 0 operations.csv > balances.csv
//! cargo run -- --bonus-cap 20 operations.csv > balances.csv
//! ```
//!
//! The program reads an operation log from the input CSV file, drives it
//! through the exchange engine, and writes the final coin balances to
//! stdout. Logs go to stderr; set `RUST_LOG` to control verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use card_exchange_engine::cli;
use card_exchange_engine::replay;
use std::process;

fn main() {
    // Logs go to stderr so stdout stays a clean CSV stream
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command-line arguments using clap
    let args = cli::parse_args();
    let config = args.to_exchange_config();

    // Replay the operation log; balances go to stdout
    let mut output = std::io::stdout();
    if let Err(e) = replay::run(&args.input_file, &mut output, config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
