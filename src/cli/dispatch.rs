//! CLI command dispatch
//!
//! Configuration problems exit with [`EXIT_CONFIG_ERROR`]; any outcome
//! other than success (or any invalid decode) exits with [`EXIT_FAILURE`].

use std::sync::Arc;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use scancheck_core::DecodedCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::{create_backend_from_config, Backend, VerificationBackend};
use crate::cli::{Args, Command, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use crate::config::{BackendKind, ConfigError, ScannerConfig};
use crate::verification::{ProductVerifier, TracingAnalytics, VerificationOutcome};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run the parsed command and return the process exit code
pub async fn run(args: Args) -> ExitCode {
    let config = match ScannerConfig::load(args.config.as_deref())
        .and_then(|config| apply_overrides(config, &args))
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return EXIT_CONFIG_ERROR;
        }
    };

    let result = match args.command {
        Command::Decode { codes } => run_decode(&config, codes).await,
        Command::Verify { codes } => {
            let Some(backend) = build_backend(&config) else {
                return EXIT_CONFIG_ERROR;
            };
            run_verify(&config, backend, codes).await
        }
        Command::ScanCount {
            tracking_id,
            period_days,
        } => {
            let Some(backend) = build_backend(&config) else {
                return EXIT_CONFIG_ERROR;
            };
            let days = period_days.unwrap_or(config.counterfeit_window_days);
            run_scan_count(&backend, &tracking_id, days).await
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            EXIT_FAILURE
        }
    }
}

/// Apply command-line flags on top of loaded configuration
pub fn apply_overrides(mut config: ScannerConfig, args: &Args) -> Result<ScannerConfig, ConfigError> {
    if let Some(locale) = &args.locale {
        config.locale = locale.clone();
    }
    if let Some(retailer_id) = &args.retailer_id {
        config.retailer_id = Some(retailer_id.clone());
    }
    if args.stub {
        config.backend = BackendKind::Stub;
    }
    config.validate()?;
    Ok(config)
}

/// Success only when every outcome is a success
pub fn exit_code_for<'a>(outcomes: impl IntoIterator<Item = &'a VerificationOutcome>) -> ExitCode {
    if outcomes.into_iter().all(VerificationOutcome::is_success) {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

fn build_backend(config: &ScannerConfig) -> Option<Backend> {
    match create_backend_from_config(config) {
        Ok(backend) => Some(backend),
        Err(err) => {
            eprintln!("Error: {}", err);
            None
        }
    }
}

async fn collect_codes(codes: Vec<String>) -> anyhow::Result<Vec<String>> {
    if !codes.is_empty() {
        return Ok(codes);
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut collected = Vec::new();
    while let Some(line) = lines.next_line().await.context("reading codes from stdin")? {
        if !line.trim().is_empty() {
            collected.push(line);
        }
    }
    Ok(collected)
}

async fn run_verify(
    config: &ScannerConfig,
    backend: Backend,
    codes: Vec<String>,
) -> anyhow::Result<ExitCode> {
    let codes = collect_codes(codes).await?;
    let verifier = Arc::new(ProductVerifier::from_config(
        config,
        Arc::new(backend),
        Arc::new(TracingAnalytics),
    ));

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling in-flight scans");
                cancel.cancel();
            }
        })
    };

    info!(count = codes.len(), concurrency = config.concurrency, "verifying codes");
    let mut outcomes = stream::iter(codes)
        .map(|code| {
            let verifier = verifier.clone();
            let cancel = cancel.clone();
            async move { verifier.verify_code_with_cancel(&code, &cancel).await }
        })
        .buffered(config.concurrency.max(1));

    let mut exit = EXIT_SUCCESS;
    while let Some(outcome) = outcomes.next().await {
        if exit_code_for([&outcome]) != EXIT_SUCCESS {
            exit = EXIT_FAILURE;
        }
        println!("{}", serde_json::to_string(&outcome)?);
    }

    verifier.flush_reports().await;
    interrupt.abort();
    Ok(exit)
}

async fn run_decode(config: &ScannerConfig, codes: Vec<String>) -> anyhow::Result<ExitCode> {
    let decoder = config.decoder();
    let mut exit = EXIT_SUCCESS;
    for code in collect_codes(codes).await? {
        let decoded: DecodedCode = decoder.decode(&code);
        if !decoded.is_valid {
            exit = EXIT_FAILURE;
        }
        println!("{}", serde_json::to_string(&decoded)?);
    }
    Ok(exit)
}

async fn run_scan_count(backend: &Backend, tracking_id: &str, days: u32) -> anyhow::Result<ExitCode> {
    let count = backend
        .scan_count(tracking_id, days)
        .await
        .with_context(|| format!("querying scan count for {}", tracking_id))?;
    if count.is_none() {
        warn!(backend = backend.name(), "backend does not report scan counts");
    }
    let body = serde_json::json!({
        "trackingId": tracking_id,
        "periodDays": days,
        "scanCount": count,
    });
    println!("{}", body);
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_overrides_win_over_config() {
        let args = Args::parse_from([
            "scancheck",
            "--stub",
            "--locale",
            "fr",
            "--retailer-id",
            "R9",
            "decode",
            "X",
        ]);
        let config = apply_overrides(ScannerConfig::default(), &args).unwrap();
        assert_eq!(config.backend, BackendKind::Stub);
        assert_eq!(config.locale, "fr");
        assert_eq!(config.retailer_id.as_deref(), Some("R9"));
    }

    #[test]
    fn test_exit_code_for_outcomes() {
        let details = crate::verification::ProductDetails::fill(
            &Default::default(),
            &Default::default(),
            "T",
            "N/A",
        );
        let ok = VerificationOutcome::verified("a", "ok".into(), details);
        let bad = VerificationOutcome::rejected("b", "no".into());
        assert_eq!(exit_code_for([&ok]), EXIT_SUCCESS);
        assert_eq!(exit_code_for([&ok, &bad]), EXIT_FAILURE);
        assert_eq!(exit_code_for(std::iter::empty()), EXIT_SUCCESS);
    }
}
