// ── HTTP error mapping ──
//
// Every request failure is rendered as a JSON `{error, code}` body with a
// status derived from the bridge error taxonomy.

use std::io;
use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use opensesame_core::CoreError;

/// Failure of a single request.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("missing query parameter '{0}'")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Failure to run the listener itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Core(core) if core.is_store_failure() => StatusCode::BAD_GATEWAY,
            Self::Core(CoreError::PointNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Core(CoreError::CommandInFlight { .. }) => StatusCode::CONFLICT,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MISSING_PARAMETER",
            Self::Core(core) => match core {
                CoreError::PointNotFound { .. } => "POINT_NOT_FOUND",
                CoreError::CommandInFlight { .. } => "COMMAND_IN_FLIGHT",
                CoreError::WriteRejected { .. } => "WRITE_REJECTED",
                CoreError::PartialReadFailure { .. } => "PARTIAL_READ_FAILURE",
                CoreError::Store(_) => "STORE_ERROR",
                CoreError::Config { .. } => "CONFIGURATION_ERROR",
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, code = self.code(), "request failed");
        } else {
            warn!(error = %self, code = self.code(), "request refused");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (HttpError::MissingParameter("id"), StatusCode::BAD_REQUEST),
            (
                CoreError::PointNotFound {
                    web_id: "x".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::CommandInFlight {
                    web_id: "x".into(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::WriteRejected {
                    external_id: "x".into(),
                    cause: opensesame_api::Error::Rejected {
                        id: "x".into(),
                        message: "offline".into(),
                    },
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CoreError::PartialReadFailure {
                    failed_id: "x".into(),
                    cause: opensesame_api::Error::NotFound { id: "x".into() },
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CoreError::Store(opensesame_api::Error::Closed).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CoreError::Config {
                    message: "no points".into(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn missing_parameter_message() {
        let err = HttpError::MissingParameter("id");
        assert_eq!(err.to_string(), "missing query parameter 'id'");
        assert_eq!(err.code(), "MISSING_PARAMETER");
    }
}
