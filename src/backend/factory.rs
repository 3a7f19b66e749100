//! Backend Factory
//!
//! Creates verification backend instances from configuration.

use std::time::Duration;

use crate::backend::http::{HttpBackend, HttpSettings, RetryPolicy};
use crate::backend::stub::StubBackend;
use crate::backend::{Backend, BackendError, Transport};
use crate::config::{BackendKind, ScannerConfig};

/// Create backend from configuration using the real HTTP transport
pub fn create_backend_from_config(config: &ScannerConfig) -> Result<Backend, BackendError> {
    match config.backend {
        BackendKind::Stub => Ok(Backend::Stub(StubBackend::new())),
        BackendKind::Http => create_backend_with_transport(config, Transport::real()?),
    }
}

/// Create backend from configuration over the given transport
///
/// The stub backend ignores the transport.
pub fn create_backend_with_transport(
    config: &ScannerConfig,
    transport: Transport,
) -> Result<Backend, BackendError> {
    if config.backend == BackendKind::Stub {
        return Ok(Backend::Stub(StubBackend::new()));
    }

    let base_url = config
        .base_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| BackendError::Configuration("Missing 'base_url' in config".to_string()))?;

    let settings = HttpSettings {
        base_url,
        verify_path: config.verify_path.clone(),
        auth_token: config.auth_token.as_deref().map(resolve_env_var),
        timeout: Duration::from_millis(config.timeout_ms),
        retry: RetryPolicy {
            max_attempts: config.retry_attempts,
            base_delay: Duration::from_millis(config.retry_delay_ms),
        },
    };

    Ok(Backend::Http(HttpBackend::new(settings, transport)?))
}

/// Resolve environment variable reference
///
/// If value starts with "env:", read from environment.
/// Otherwise return value as-is.
fn resolve_env_var(value: &str) -> String {
    if let Some(rest) = value.strip_prefix("env:") {
        std::env::var(rest).unwrap_or_else(|_| format!("env:{}", rest))
    } else {
        value.to_string()
    }
}
