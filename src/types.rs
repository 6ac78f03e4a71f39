//! Request and response bodies of the upload API.
//!
//! Request fields the caller must supply are still `Option`s so that a missing field is reported
//! as invalid input by the session manager rather than rejected by the JSON extractor.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StartUploadRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadResponse {
    pub key: String,
    pub upload_id: String,
}

/// Query string of `PUT /api/upload-part`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPartQuery {
    pub key: Option<String>,
    pub upload_id: Option<String>,
    pub part_number: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPartResponse {
    pub etag: String,
}

/// A part acknowledged by the store, as submitted at completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    pub part_number: i32,
    pub etag: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<PartRecord>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteUploadResponse {
    pub location: String,
}

/// Query string of `DELETE /api/abort-upload`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadQuery {
    pub key: Option<String>,
    pub upload_id: Option<String>,
}

/// One entry of `GET /api/files`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub url: String,
    pub uploaded: DateTime<Utc>,
}
