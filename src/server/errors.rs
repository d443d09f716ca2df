//! HTTP error mapping
//!
//! Every failure leaves the server as `{ "error": "..." }` with a status
//! code; provider details are logged here and never sent to the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::query::QueryError;

pub const MISSING_QUESTION: &str = "Missing question";
pub const INVALID_BODY: &str = "Invalid request body";
pub const ANSWER_FAILED: &str = "Failed to generate an answer";

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing question")]
    MissingQuestion,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingQuestion | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Query(QueryError::EmptyQuestion) => StatusCode::BAD_REQUEST,
            Self::Query(
                QueryError::NotReady(_) | QueryError::Provider(_) | QueryError::Timeout(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller
    #[inline]
    pub fn public_message(&self) -> String {
        match self {
            Self::MissingQuestion | Self::Query(QueryError::EmptyQuestion) => {
                MISSING_QUESTION.to_string()
            }
            Self::InvalidBody(_) => INVALID_BODY.to_string(),
            Self::Query(QueryError::NotReady(reason)) => {
                format!("Knowledge base is not ready: {}. Please try again later.", reason)
            }
            Self::Query(QueryError::Provider(_) | QueryError::Timeout(_)) => {
                ANSWER_FAILED.to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
