use axum::http::StatusCode;
use thiserror::Error;

/// Remote hop a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Geocode,
    Weather,
    Resolver,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Geocode => "geocode",
            Upstream::Weather => "weather",
            Upstream::Resolver => "resolver",
        }
    }

    /// Message shown to callers when this hop fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Upstream::Geocode => "zipcode lookup failed",
            Upstream::Weather => "weather lookup failed",
            Upstream::Resolver => "weather resolver unavailable",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure of a resolution request.
///
/// Built where the failure happens and passed up unchanged; only the HTTP
/// boundary turns it into a status code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid zipcode{}", suffix(.detail))]
    InvalidInput { detail: Option<String> },

    #[error("zipcode not found{}", suffix(.detail))]
    NotFound { detail: Option<String> },

    #[error("{upstream} unavailable{}", suffix(.detail))]
    UpstreamUnavailable { upstream: Upstream, detail: Option<String> },

    #[error("weather API credential is not configured{}", suffix(.detail))]
    MissingCredential { detail: Option<String> },

    #[error("{upstream} protocol error{}{}", status_suffix(.status), suffix(.detail))]
    UpstreamProtocolError {
        upstream: Upstream,
        status: Option<u16>,
        detail: Option<String>,
    },
}

fn suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl PipelineError {
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput { detail: Some(detail.into()) }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound { detail: Some(detail.into()) }
    }

    /// Transport-level failure (connect, DNS, timeout, truncated body).
    /// The URL is stripped since it may carry the API key.
    pub fn unavailable(upstream: Upstream, err: reqwest::Error) -> Self {
        Self::UpstreamUnavailable { upstream, detail: Some(err.without_url().to_string()) }
    }

    pub fn protocol(upstream: Upstream, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::UpstreamProtocolError { upstream, status, detail: Some(detail.into()) }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::UpstreamUnavailable { .. }
            | PipelineError::MissingCredential { .. }
            | PipelineError::UpstreamProtocolError { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Caller-facing message. Never includes the diagnostic detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput { .. } => "invalid zipcode",
            PipelineError::NotFound { .. } => "can not find zipcode",
            PipelineError::MissingCredential { .. } => Upstream::Weather.failure_message(),
            PipelineError::UpstreamUnavailable { upstream, .. }
            | PipelineError::UpstreamProtocolError { upstream, .. } => upstream.failure_message(),
        }
    }
}
