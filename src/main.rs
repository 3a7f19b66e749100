//! ScanCheck CLI
//!
//! Verifies scanned product codes from the command line or stdin and
//! prints one JSON outcome per line.
//!
//! EXIT: 0 all verified, 1 any warning or error, 2 configuration error

use clap::Parser;

use scancheck::cli::{self, Args};
use scancheck::telemetry::init_tracing;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_json);

    let exit_code = cli::run(args).await;
    std::process::exit(exit_code);
}
