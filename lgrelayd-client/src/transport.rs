use std::time::Duration;

use async_trait::async_trait;
use lgrelay_core::{Envelope, RelayError, RelayResult};
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body returned by a peer's run endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerReply {
    pub status: u16,
    pub body: String,
}

impl PeerReply {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Delivers an envelope to a peer endpoint.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn post(&self, url: &str, envelope: &Envelope) -> RelayResult<PeerReply>;
}

/// JSON over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("lgrelay/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| RelayError::transport(format!("failed to build HTTP client: {}", err)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn post(&self, url: &str, envelope: &Envelope) -> RelayResult<PeerReply> {
        debug!(url, command = %envelope.command, "posting envelope");

        let response = self
            .client
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(|err| RelayError::transport(format!("failed to reach {}: {}", url, err)))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| {
            RelayError::transport(format!("failed to read reply from {}: {}", url, err))
        })?;

        Ok(PeerReply { status, body })
    }
}
