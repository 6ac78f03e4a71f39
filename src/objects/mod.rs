//! Object store adapter.
//!
//! Everything the upload coordinator needs from the backing store goes through the
//! [`ObjectStore`] trait: opening a multipart upload, storing parts, assembling them into one
//! object and, for the listing view, enumerating assembled objects.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::body::Body;

mod config;
pub use config::Config;
mod errors;
pub use errors::{Error, Result};
mod memory;
pub use memory::MemoryStore;
pub(crate) mod s3;
pub use s3::S3Config;
pub use s3::S3;

/// A multipart upload opened in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartUpload {
    /// Key the store will assemble the object under.
    pub key: String,
    /// Opaque upload id issued by the store.
    pub upload_id: String,
}

/// A part acknowledged by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub part_number: i32,
    pub e_tag: String,
}

/// An assembled object, as seen by the listing view.
#[derive(Clone, Debug)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub uploaded: DateTime<Utc>,
}

/// Capability interface over a backend object store with multipart upload support.
///
/// Implementations hold no per-session state beyond what the store itself keeps: every call
/// carries the key and upload id it applies to, so any number of server instances may serve the
/// same upload.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Open a multipart upload for `key`.
    async fn create_upload(&self, key: &str) -> Result<MultipartUpload>;

    /// Store one part. The body is handed to the store as a stream; `content_length` is
    /// forwarded when the caller knows it.
    async fn put_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        content_length: Option<u64>,
        body: Body,
    ) -> Result<Part>;

    /// Assemble the given parts into the final object and return its key.
    async fn complete_upload(&self, key: &str, upload_id: &str, parts: Vec<Part>)
        -> Result<String>;

    /// Discard an open multipart upload and any parts stored for it.
    async fn abort_upload(&self, key: &str, upload_id: &str) -> Result<()>;

    /// List assembled objects.
    async fn list(&self) -> Result<Vec<ObjectSummary>>;
}

#[cfg(test)]
mod test {
    use super::*;

    // validate object safety
    #[allow(dead_code)]
    struct Whatever {
        objectstore: Box<dyn ObjectStore>,
    }
}
