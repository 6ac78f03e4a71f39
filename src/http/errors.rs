use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::{IntoResponse, Response};

use crate::errors::Error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Error::InvalidInput(_) | Error::MethodNotAllowed | Error::NotFound(_) => {
                (status, format!("{}", self)).into_response()
            }
            Error::UpstreamFailure { .. } => {
                tracing::warn!("object store rejected request: {}", self);
                (status, format!("{}", self)).into_response()
            }
            Error::ConfigError(_) => {
                tracing::warn!("{}", self);
                (status, format!("{}", self)).into_response()
            }
            e => {
                tracing::warn!("{:?}", e);
                (status, String::from("internal server error")).into_response()
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Error {
        Error::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Error {
        Error::InvalidInput(rejection.body_text())
    }
}
