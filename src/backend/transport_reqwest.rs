//! Real HTTP transport using reqwest

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::trace;

use crate::backend::transport_types::{BackendError, HttpReply, HttpTransport};

/// Real HTTP transport
///
/// Timeouts are enforced by the caller so they can be combined with
/// cancellation; the client itself only bounds the connect phase.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("scancheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(request: RequestBuilder, headers: &[(&str, &str)]) -> Result<HttpReply, BackendError> {
        let request = headers
            .iter()
            .fold(request, |request, (key, value)| request.header(*key, *value));

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        trace!(status, bytes = body.len(), "http exchange complete");
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpReply, BackendError> {
        Self::send(self.client.post(url).body(body.to_string()), headers).await
    }

    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpReply, BackendError> {
        Self::send(self.client.get(url), headers).await
    }
}
