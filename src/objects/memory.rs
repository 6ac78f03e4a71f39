use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use hyper::body::Body;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::errors::{Error, Result};
use super::{MultipartUpload, ObjectStore, ObjectSummary, Part};

/// Process-local [`ObjectStore`] with the same multipart rules as S3.
///
/// Parts are tagged with the hex SHA-256 of their content. Completion fails with
/// [`Error::InvalidPart`] when a listed part was never stored or its tag does not match, and with
/// [`Error::NoSuchUpload`] once the upload has been completed or aborted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    uploads: HashMap<String, PendingUpload>,
    objects: BTreeMap<String, StoredObject>,
}

struct PendingUpload {
    key: String,
    parts: BTreeMap<i32, StoredPart>,
}

struct StoredPart {
    e_tag: String,
    data: Bytes,
}

struct StoredObject {
    data: Bytes,
    uploaded: DateTime<Utc>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a poisoned lock only means another request panicked mid-update; the maps are still
        // structurally valid
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Contents of an assembled object.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().objects.get(key).map(|o| o.data.clone())
    }

    /// Number of multipart uploads that are neither completed nor aborted.
    pub fn open_uploads(&self) -> usize {
        self.lock().uploads.len()
    }
}

fn pending<'a>(inner: &'a mut Inner, key: &str, upload_id: &str) -> Result<&'a mut PendingUpload> {
    match inner.uploads.get_mut(upload_id) {
        Some(upload) if upload.key == key => Ok(upload),
        _ => Err(Error::NoSuchUpload(upload_id.to_string())),
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create_upload(&self, key: &str) -> Result<MultipartUpload> {
        let upload_id = Uuid::new_v4().to_string();
        self.lock().uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(MultipartUpload {
            key: key.to_string(),
            upload_id,
        })
    }

    async fn put_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        _content_length: Option<u64>,
        body: Body,
    ) -> Result<Part> {
        pending(&mut self.lock(), key, upload_id)?;

        let data = hyper::body::to_bytes(body).await?;
        let e_tag = format!("{:x}", Sha256::digest(&data));

        // the upload may have been completed or aborted while the body was in flight
        let mut inner = self.lock();
        let upload = pending(&mut inner, key, upload_id)?;
        upload.parts.insert(
            part_number,
            StoredPart {
                e_tag: e_tag.clone(),
                data,
            },
        );
        Ok(Part { part_number, e_tag })
    }

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<Part>,
    ) -> Result<String> {
        let mut inner = self.lock();
        let upload = pending(&mut inner, key, upload_id)?;

        let mut data = BytesMut::new();
        let mut previous = 0;
        for part in &parts {
            if part.part_number <= previous {
                return Err(Error::InvalidPart(format!(
                    "part {} is out of order",
                    part.part_number
                )));
            }
            previous = part.part_number;
            match upload.parts.get(&part.part_number) {
                Some(stored) if stored.e_tag == part.e_tag => data.extend_from_slice(&stored.data),
                Some(_) => {
                    return Err(Error::InvalidPart(format!(
                        "etag mismatch for part {}",
                        part.part_number
                    )))
                }
                None => {
                    return Err(Error::InvalidPart(format!(
                        "part {} was never uploaded",
                        part.part_number
                    )))
                }
            }
        }

        inner.uploads.remove(upload_id);
        inner.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.freeze(),
                uploaded: Utc::now(),
            },
        );
        Ok(key.to_string())
    }

    async fn abort_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        let mut inner = self.lock();
        pending(&mut inner, key, upload_id)?;
        inner.uploads.remove(upload_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectSummary>> {
        Ok(self
            .lock()
            .objects
            .iter()
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
                uploaded: object.uploaded,
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn put(
        store: &MemoryStore,
        upload: &MultipartUpload,
        n: i32,
        data: &'static str,
    ) -> Part {
        store
            .put_part(&upload.key, &upload.upload_id, n, None, Body::from(data))
            .await
            .expect("part should be stored")
    }

    #[tokio::test]
    async fn assembles_parts_in_order() {
        let store = MemoryStore::default();
        let upload = store.create_upload("1-a.txt").await.unwrap();
        let p1 = put(&store, &upload, 1, "hello ").await;
        let p2 = put(&store, &upload, 2, "world").await;

        let key = store
            .complete_upload(&upload.key, &upload.upload_id, vec![p1, p2])
            .await
            .unwrap();

        assert_eq!(key, "1-a.txt");
        assert_eq!(store.get("1-a.txt").unwrap(), Bytes::from("hello world"));
        assert_eq!(store.open_uploads(), 0);
    }

    #[tokio::test]
    async fn rejects_mismatched_tag() {
        let store = MemoryStore::default();
        let upload = store.create_upload("1-a.txt").await.unwrap();
        let mut p1 = put(&store, &upload, 1, "hello").await;
        p1.e_tag = String::from("bogus");

        let err = store
            .complete_upload(&upload.key, &upload.upload_id, vec![p1])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidPart(_)));
        assert_eq!(err.status(), Some(400));
        assert_eq!(store.open_uploads(), 1);
    }

    #[tokio::test]
    async fn rejects_part_that_was_never_uploaded() {
        let store = MemoryStore::default();
        let upload = store.create_upload("1-a.txt").await.unwrap();
        let p1 = put(&store, &upload, 1, "hello").await;
        let ghost = Part {
            part_number: 2,
            e_tag: p1.e_tag.clone(),
        };

        let err = store
            .complete_upload(&upload.key, &upload.upload_id, vec![p1, ghost])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidPart(_)));
    }

    #[tokio::test]
    async fn unknown_upload_is_rejected() {
        let store = MemoryStore::default();
        let err = store
            .put_part("k", "nope", 1, None, Body::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchUpload(_)));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn abort_discards_upload() {
        let store = MemoryStore::default();
        let upload = store.create_upload("1-a.txt").await.unwrap();
        put(&store, &upload, 1, "hello").await;

        store
            .abort_upload(&upload.key, &upload.upload_id)
            .await
            .unwrap();

        assert_eq!(store.open_uploads(), 0);
        assert!(store.list().await.unwrap().is_empty());
    }
}
