//! HTTP transport selection
//!
//! The verification backend talks HTTP through [`Transport`], which is
//! either the real reqwest client or a scripted fake.

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::backend::transport_fake::{FakeStep, FakeTransport, RecordedRequest};
pub use crate::backend::transport_reqwest::ReqwestTransport;
pub use crate::backend::transport_types::{BackendError, HttpReply, HttpTransport};

/// Concrete transport enum
///
/// The fake is shared so tests can inspect recorded requests after handing
/// the transport to a backend.
#[derive(Debug, Clone)]
pub enum Transport {
    Real(ReqwestTransport),
    Fake(Arc<FakeTransport>),
}

impl Transport {
    pub fn real() -> Result<Self, BackendError> {
        Ok(Transport::Real(ReqwestTransport::new()?))
    }

    pub fn fake(fake: Arc<FakeTransport>) -> Self {
        Transport::Fake(fake)
    }
}

#[async_trait]
impl HttpTransport for Transport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpReply, BackendError> {
        match self {
            Transport::Real(t) => t.post_json(url, headers, body).await,
            Transport::Fake(t) => t.post_json(url, headers, body).await,
        }
    }

    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpReply, BackendError> {
        match self {
            Transport::Real(t) => t.get_json(url, headers).await,
            Transport::Fake(t) => t.get_json(url, headers).await,
        }
    }
}
