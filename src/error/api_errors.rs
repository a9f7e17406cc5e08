use either::{Either, Left};
use reqwest::StatusCode;
use thiserror::Error;

use super::MetricLabel;

/// Set of errors occurring while reading from the Pulumi Cloud API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An error sending the request or receiving the response.
    #[error("{operation}: HTTP request failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: unexpected status {status}")]
    UnexpectedStatus { operation: &'static str, status: StatusCode },

    /// The response body could not be decoded into the expected payload.
    #[error("{operation}: decoding response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("API base url cannot be a base for requests: {0}")]
    NotABaseUrl(url::Url),

    #[error("access token is not a valid header value: {0}")]
    InvalidAccessToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to build API client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    pub fn http(operation: &'static str, source: reqwest::Error) -> Self {
        Self::Http { operation, source }
    }

    pub fn decode(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { operation, source }
    }
}

impl MetricLabel for ApiError {
    fn slug(&self) -> String {
        "api".into()
    }

    fn next(&self) -> Either<String, Box<&dyn MetricLabel>> {
        match self {
            Self::Http { source, .. } if source.is_timeout() => Left("http::timeout".into()),
            Self::Http { .. } => Left("http::request".into()),
            Self::UnexpectedStatus { status, .. } => Left(format!("http::status::{}", status.as_u16())),
            Self::Decode { .. } => Left("json".into()),
            Self::Url(_) | Self::NotABaseUrl(_) => Left("url".into()),
            Self::InvalidAccessToken(_) | Self::Client(_) => Left("client".into()),
        }
    }
}
