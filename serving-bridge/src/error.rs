use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Typed error variants for the serving bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Missing parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Unsupported input type: {0}")]
    UnsupportedType(String),

    #[error("Invalid {dtype} value at index {index}: {value:?}")]
    InvalidValue {
        index: usize,
        value: String,
        dtype: &'static str,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Prediction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Remote error ({code}): {message}")]
    Remote { code: tonic::Code, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Return a machine-readable error code string for this error variant.
    pub fn code(&self) -> &str {
        match self {
            Self::MissingParam(_) => "MISSING_PARAM",
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// HTTP status reported to the caller for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParam(_)
            | Self::InvalidParams(_)
            | Self::UnsupportedType(_)
            | Self::InvalidValue { .. } => StatusCode::BAD_REQUEST,
            Self::Transport(_) | Self::Remote { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a gRPC status returned by the prediction service.
    ///
    /// Connection failures surface either as `Unavailable` or as a status
    /// wrapping a transport error; both are reported as `Transport`.
    pub fn from_status(status: tonic::Status) -> Self {
        let from_transport = std::error::Error::source(&status)
            .is_some_and(|source| source.is::<tonic::transport::Error>());
        match status.code() {
            tonic::Code::Unavailable => Self::Transport(status.message().to_string()),
            _ if from_transport => Self::Transport(status.message().to_string()),
            code => Self::Remote {
                code,
                message: status.message().to_string(),
            },
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let body = format!("{}: {}", self.code(), self);
        (self.status(), body).into_response()
    }
}
