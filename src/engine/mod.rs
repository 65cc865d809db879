mod client;
mod health;

pub use client::{parse_base_url, HttpBackend};
pub(crate) use health::{spawn_health_poller, PollerGuard};

use crate::model::{AnalysisRequest, AnalysisResponse, HealthResponse};
use async_trait::async_trait;

/// Failures of a single backend call, classified so callers can match on them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("Server returned {status}{}", reason_suffix(.reason))]
    Server { status: u16, reason: String },
    /// The request never produced a response (DNS, connect, timeout, abort).
    /// The detail is kept for logs only; users see the generic message.
    #[error("Failed to connect to the analysis engine. Is the backend running?")]
    Transport(String),
    /// A 2xx response whose body does not match the contract.
    #[error("Malformed response from the analysis engine: {0}")]
    Decode(String),
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(": {reason}")
    }
}

/// The analysis backend's HTTP surface.
#[async_trait]
pub trait AnalysisBackend: Send + Sync + 'static {
    /// `GET /`
    async fn health(&self) -> Result<HealthResponse, ApiError>;
    /// `POST /analyze`
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ApiError>;
}
