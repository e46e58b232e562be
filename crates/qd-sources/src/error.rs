use thiserror::Error;

/// Failure talking to an external service
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(String),
}
