use axum::http::StatusCode;
use thiserror;

use crate::objects;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The caller sent missing or malformed parameters.
    #[error("{0}")]
    InvalidInput(String),

    /// The object store rejected an operation. The store's message is kept verbatim.
    #[error("{}", upstream_message(.status, .message))]
    UpstreamFailure {
        status: Option<u16>,
        message: String,
    },

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("API endpoint not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("config deserialization error")]
    ConfigDeserializationError(#[from] serde_yaml::Error),
    #[error("io error")]
    IOError(#[from] std::io::Error),
    #[error("hyper error")]
    HyperError(#[from] hyper::Error),
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(s) => format!("{s} {message}"),
        None => message.to_string(),
    }
}

impl Error {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<objects::Error> for Error {
    fn from(e: objects::Error) -> Error {
        Error::UpstreamFailure {
            status: e.status(),
            message: e.to_string(),
        }
    }
}
