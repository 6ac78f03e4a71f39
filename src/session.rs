//! Upload session management.
//!
//! [`UploadSessions`] owns the three handshake operations (start, upload part, complete). It keeps
//! no table of open sessions: each call names its key and upload id, and the object store decides
//! whether that session exists. [`UploadSession`] is the caller's view of one session and tracks
//! the part records it has collected.
use std::cmp::Reverse;
use std::sync::Arc;

use hyper::body::Body;

use crate::errors::{Error, Result};
use crate::keys::KeyMinter;
use crate::objects::{ObjectStore, Part};
use crate::types::{
    AbortUploadQuery, CompleteUploadRequest, CompleteUploadResponse, FileEntry, PartRecord,
    StartUploadRequest, StartUploadResponse, UploadPartQuery, UploadPartResponse,
};

/// Server side of the multipart upload handshake.
#[derive(Clone)]
pub struct UploadSessions {
    objects: Arc<dyn ObjectStore>,
    public_url: String,
    keys: Arc<KeyMinter>,
}

impl UploadSessions {
    /// `public_url` is the base every assembled object's location is built from.
    pub fn new(objects: Arc<dyn ObjectStore>, public_url: impl Into<String>) -> Self {
        Self {
            objects,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            keys: Arc::new(KeyMinter::default()),
        }
    }

    /// Public retrieval location of the object stored under `key`.
    pub fn location(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Open a multipart upload for a file called `name`.
    pub async fn start_upload(&self, request: StartUploadRequest) -> Result<StartUploadResponse> {
        let name = request.name.unwrap_or_default();
        let key = self.keys.mint(&name)?;

        let upload = self.objects.create_upload(&key).await?;
        tracing::info!(key = %upload.key, upload_id = %upload.upload_id, "started upload");

        Ok(StartUploadResponse {
            key: upload.key,
            upload_id: upload.upload_id,
        })
    }

    /// Stream one part to the store.
    ///
    /// All parameters are checked before the store is contacted.
    pub async fn upload_part(
        &self,
        query: UploadPartQuery,
        content_length: Option<u64>,
        body: Body,
    ) -> Result<UploadPartResponse> {
        let key = required(query.key, "key")?;
        let upload_id = required(query.upload_id, "uploadId")?;
        let part_number = parse_part_number(&required(query.part_number, "partNumber")?)?;

        let part = self
            .objects
            .put_part(&key, &upload_id, part_number, content_length, body)
            .await?;
        tracing::debug!(%key, %upload_id, part_number, e_tag = %part.e_tag, "stored part");

        Ok(UploadPartResponse { etag: part.e_tag })
    }

    /// Assemble the listed parts and return the object's public location.
    ///
    /// Parts must be numbered `1..=n` in ascending order. Assembly failures reported by the
    /// store are passed back to the caller untouched; only the caller holds the data needed to
    /// try again.
    pub async fn complete_upload(
        &self,
        request: CompleteUploadRequest,
    ) -> Result<CompleteUploadResponse> {
        let key = required(request.key, "key")?;
        let upload_id = required(request.upload_id, "uploadId")?;
        let parts = match request.parts {
            Some(parts) if !parts.is_empty() => parts,
            _ => {
                return Err(Error::InvalidInput(String::from(
                    "Request body missing key, uploadId, or parts",
                )))
            }
        };
        validate_parts(&parts)?;

        let parts = parts
            .into_iter()
            .map(|p| Part {
                part_number: p.part_number,
                e_tag: p.etag,
            })
            .collect();
        let final_key = self
            .objects
            .complete_upload(&key, &upload_id, parts)
            .await?;

        let location = self.location(&final_key);
        tracing::info!(%key, %upload_id, %location, "completed upload");
        Ok(CompleteUploadResponse { location })
    }

    /// Discard an open upload. Nothing calls this implicitly; abandoned sessions are left for
    /// the store to expire.
    pub async fn abort_upload(&self, query: AbortUploadQuery) -> Result<()> {
        let key = required(query.key, "key")?;
        let upload_id = required(query.upload_id, "uploadId")?;
        self.objects.abort_upload(&key, &upload_id).await?;
        tracing::info!(%key, %upload_id, "aborted upload");
        Ok(())
    }

    /// Assembled objects with their public locations.
    pub async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut files: Vec<FileEntry> = self
            .objects
            .list()
            .await?
            .into_iter()
            .map(|o| FileEntry {
                url: self.location(&o.key),
                name: o.key,
                size: o.size,
                uploaded: o.uploaded,
            })
            .collect();
        files.sort_by_key(|f| Reverse(f.uploaded));
        Ok(files)
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::InvalidInput(format!("Missing required parameter: {name}"))),
    }
}

/// Part numbers are 1-based; zero is as invalid as a missing value.
fn parse_part_number(value: &str) -> Result<i32> {
    match value.parse::<i32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidInput(format!(
            "partNumber must be a positive integer, got {value:?}"
        ))),
    }
}

fn validate_parts(parts: &[PartRecord]) -> Result<()> {
    for (i, part) in parts.iter().enumerate() {
        let expected = i as i32 + 1;
        if part.part_number != expected {
            return Err(Error::InvalidInput(format!(
                "parts must be numbered 1..={} in order, found partNumber {} at position {}",
                parts.len(),
                part.part_number,
                expected
            )));
        }
        if part.etag.is_empty() {
            return Err(Error::InvalidInput(format!(
                "part {} is missing its etag",
                part.part_number
            )));
        }
    }
    Ok(())
}

/// Lifecycle of an [`UploadSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadStatus {
    Open,
    Completing,
    Completed,
    Aborted,
}

/// One multipart upload as seen by the party driving it.
///
/// Part records are appended only after the store acknowledged the part and must arrive in
/// order, so the collected sequence is always `1..=n` with no gaps.
#[derive(Clone, Debug)]
pub struct UploadSession {
    key: String,
    upload_id: String,
    status: UploadStatus,
    parts: Vec<PartRecord>,
}

impl UploadSession {
    pub fn open(started: StartUploadResponse) -> Self {
        Self {
            key: started.key,
            upload_id: started.upload_id,
            status: UploadStatus::Open,
            parts: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    /// Part number the next acknowledged part must carry.
    pub fn next_part_number(&self) -> i32 {
        self.parts.len() as i32 + 1
    }

    pub fn record_part(&mut self, part: PartRecord) -> Result<()> {
        self.require_open()?;
        if part.part_number != self.next_part_number() {
            return Err(Error::InvalidInput(format!(
                "expected part {}, got part {}",
                self.next_part_number(),
                part.part_number
            )));
        }
        self.parts.push(part);
        Ok(())
    }

    /// Move to `Completing` and hand out the part list to submit.
    pub fn begin_completion(&mut self) -> Result<Vec<PartRecord>> {
        self.require_open()?;
        if self.parts.is_empty() {
            return Err(Error::InvalidInput(String::from(
                "cannot complete an upload without parts",
            )));
        }
        self.status = UploadStatus::Completing;
        Ok(self.parts.clone())
    }

    pub fn mark_completed(&mut self) {
        self.status = UploadStatus::Completed;
    }

    pub fn mark_aborted(&mut self) {
        self.status = UploadStatus::Aborted;
    }

    fn require_open(&self) -> Result<()> {
        match self.status {
            UploadStatus::Open => Ok(()),
            s => Err(Error::InvalidInput(format!(
                "upload {} is {s:?}, not Open",
                self.upload_id
            ))),
        }
    }
}
