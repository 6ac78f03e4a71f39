use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upload API answered with a non-success status.
    #[error("{status} {body}")]
    Api { status: u16, body: String },

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("{0}")]
    Core(#[from] crate::Error),

    #[error("cannot upload an empty file")]
    EmptyFile,

    #[error("source is {actual} bytes but the plan covers {planned}")]
    SizeMismatch { planned: u64, actual: u64 },

    #[error("an upload is already in progress")]
    Busy,

    #[error("failed to upload part {part_number}/{total_parts}: {source}")]
    PartFailed {
        part_number: i32,
        total_parts: usize,
        #[source]
        source: Box<Error>,
    },
}
