use async_trait::async_trait;
use bytes::Bytes;
use hyper::body::Body;
use reqwest::Response;
use serde::de::DeserializeOwned;

use super::errors::{Error, Result};
use crate::session::UploadSessions;
use crate::types::{
    CompleteUploadRequest, CompleteUploadResponse, FileEntry, PartRecord, StartUploadRequest,
    StartUploadResponse, UploadPartQuery, UploadPartResponse,
};

/// The upload handshake as seen from the uploading side.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn start_upload(&self, name: &str) -> Result<StartUploadResponse>;

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadPartResponse>;

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<PartRecord>,
    ) -> Result<CompleteUploadResponse>;

    async fn list_files(&self) -> Result<Vec<FileEntry>>;
}

/// [`SessionApi`] over the HTTP upload API.
#[derive(Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:13030`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }
}

async fn json_or_error<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable response body: {e}>"));
        return Err(Error::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn start_upload(&self, name: &str) -> Result<StartUploadResponse> {
        let response = self
            .client
            .post(self.url("start-upload"))
            .json(&StartUploadRequest {
                name: Some(name.to_string()),
            })
            .send()
            .await?;
        json_or_error(response).await
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadPartResponse> {
        let response = self
            .client
            .put(self.url("upload-part"))
            .query(&UploadPartQuery {
                key: Some(key.to_string()),
                upload_id: Some(upload_id.to_string()),
                part_number: Some(part_number.to_string()),
            })
            .body(data)
            .send()
            .await?;
        json_or_error(response).await
    }

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<PartRecord>,
    ) -> Result<CompleteUploadResponse> {
        let response = self
            .client
            .post(self.url("complete-upload"))
            .json(&CompleteUploadRequest {
                key: Some(key.to_string()),
                upload_id: Some(upload_id.to_string()),
                parts: Some(parts),
            })
            .send()
            .await?;
        json_or_error(response).await
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let response = self.client.get(self.url("files")).send().await?;
        json_or_error(response).await
    }
}

fn rejected(e: crate::Error) -> Error {
    Error::Api {
        status: e.status_code().as_u16(),
        body: e.to_string(),
    }
}

/// In-process [`SessionApi`], for driving uploads without an HTTP hop.
#[async_trait]
impl SessionApi for UploadSessions {
    async fn start_upload(&self, name: &str) -> Result<StartUploadResponse> {
        UploadSessions::start_upload(
            self,
            StartUploadRequest {
                name: Some(name.to_string()),
            },
        )
        .await
        .map_err(rejected)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadPartResponse> {
        let query = UploadPartQuery {
            key: Some(key.to_string()),
            upload_id: Some(upload_id.to_string()),
            part_number: Some(part_number.to_string()),
        };
        let content_length = Some(data.len() as u64);
        UploadSessions::upload_part(self, query, content_length, Body::from(data))
            .await
            .map_err(rejected)
    }

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<PartRecord>,
    ) -> Result<CompleteUploadResponse> {
        UploadSessions::complete_upload(
            self,
            CompleteUploadRequest {
                key: Some(key.to_string()),
                upload_id: Some(upload_id.to_string()),
                parts: Some(parts),
            },
        )
        .await
        .map_err(rejected)
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>> {
        UploadSessions::list_files(self).await.map_err(rejected)
    }
}
