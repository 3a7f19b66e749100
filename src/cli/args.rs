//! CLI argument parsing
//!
//! ```text
//! scancheck [--config PATH] [--locale L] [--retailer-id ID] [--stub] [--log-json] <COMMAND>
//!
//!   verify [CODES...]        verify codes (stdin lines when none given)
//!   decode [CODES...]        print the decoded form of each code
//!   scan-count <TRACKING_ID> ask the service how often a code was scanned
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "scancheck", version, about = "Verify scanned product codes")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Message locale (en, es, pt, fr, de, zh, ...)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    #[arg(long, global = true, value_name = "ID")]
    pub retailer_id: Option<String>,

    /// Use the offline stub backend
    #[arg(long, global = true)]
    pub stub: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Verify codes and print one JSON outcome per line
    Verify { codes: Vec<String> },

    /// Decode codes without contacting the backend
    Decode { codes: Vec<String> },

    /// Query the service-side scan counter
    ScanCount {
        tracking_id: String,

        /// Counting period; defaults to the configured window
        #[arg(long)]
        period_days: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verify_with_global_flags() {
        let args = Args::try_parse_from([
            "scancheck",
            "verify",
            "SYN-A-1",
            "4006381333931",
            "--stub",
            "--locale",
            "es",
        ])
        .unwrap();
        assert!(args.stub);
        assert_eq!(args.locale.as_deref(), Some("es"));
        assert_eq!(
            args.command,
            Command::Verify {
                codes: vec!["SYN-A-1".to_string(), "4006381333931".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_scan_count() {
        let args =
            Args::try_parse_from(["scancheck", "scan-count", "TRK1", "--period-days", "30"]).unwrap();
        assert_eq!(
            args.command,
            Command::ScanCount {
                tracking_id: "TRK1".to_string(),
                period_days: Some(30)
            }
        );
    }

    #[test]
    fn test_verify_without_codes_reads_stdin() {
        let args = Args::try_parse_from(["scancheck", "verify"]).unwrap();
        assert_eq!(args.command, Command::Verify { codes: vec![] });
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Args::try_parse_from(["scancheck"]).is_err());
    }
}
