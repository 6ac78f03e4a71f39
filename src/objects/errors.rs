//! ObjectStore errors

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

/// General purpose [`super::ObjectStore`] error handling.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid store endpoint {hostname:?}: {reason}")]
    InvalidEndpoint { hostname: String, reason: String },

    #[error("failed to read part body: {0}")]
    BodyError(#[from] hyper::Error),

    /// The store rejected an operation. `message` carries the store's own error text.
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("NoSuchUpload: upload {0} does not exist")]
    NoSuchUpload(String),

    #[error("InvalidPart: {0}")]
    InvalidPart(String),

    #[error("failed to initiate multipart upload: {0}")]
    FailedToInitiateUpload(&'static str),
    #[error("store returned no etag for part {0}")]
    MissingETag(i32),
}

impl Error {
    /// HTTP status the store answered with, if the error came from a store response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => *status,
            Error::NoSuchUpload(_) => Some(404),
            Error::InvalidPart(_) => Some(400),
            _ => None,
        }
    }
}

impl<E> From<SdkError<E>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: SdkError<E>) -> Error {
        let status = e.raw_response().map(|r| r.status().as_u16());
        Error::Upstream {
            status,
            message: format!("{}", DisplayErrorContext(&e)),
        }
    }
}
