//! Sequential part scheduling.
//!
//! Parts go out one at a time in plan order: part `n + 1` is read and sent only after part `n`
//! was acknowledged. The first failure ends the run. Nothing is retried and no progress is kept,
//! so starting over means starting a new upload.
use super::api::SessionApi;
use super::errors::{Error, Result};
use super::source::PartSource;
use crate::plan::PartPlan;
use crate::session::UploadSession;
use crate::types::PartRecord;

pub struct ChunkScheduler {
    plan: PartPlan,
}

impl ChunkScheduler {
    pub fn new(plan: PartPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &PartPlan {
        &self.plan
    }

    /// Upload every planned part into `session`, calling `on_acknowledged` with each part number
    /// once the store has accepted it.
    pub async fn run<A, S, F>(
        &self,
        api: &A,
        session: &mut UploadSession,
        source: &mut S,
        mut on_acknowledged: F,
    ) -> Result<()>
    where
        A: SessionApi + ?Sized,
        S: PartSource + ?Sized,
        F: FnMut(i32) + Send,
    {
        if source.size() != self.plan.file_size() {
            return Err(Error::SizeMismatch {
                planned: self.plan.file_size(),
                actual: source.size(),
            });
        }

        let total_parts = self.plan.len();
        for range in &self.plan {
            let part_number = range.part_number;
            let failed = |e: Error| Error::PartFailed {
                part_number,
                total_parts,
                source: Box::new(e),
            };

            let data = source.read_range(range).await.map_err(failed)?;
            tracing::debug!(
                key = session.key(),
                part_number,
                total_parts,
                bytes = data.len(),
                "uploading part"
            );
            let uploaded = api
                .upload_part(session.key(), session.upload_id(), part_number, data)
                .await
                .map_err(failed)?;

            session
                .record_part(PartRecord {
                    part_number,
                    etag: uploaded.etag,
                })
                .map_err(|e| failed(e.into()))?;
            on_acknowledged(part_number);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::types::{
        CompleteUploadResponse, FileEntry, StartUploadResponse, UploadPartResponse,
    };

    /// Records every call and fails the part numbered `fail_at`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(i32, Bytes)>>,
        fail_at: Option<i32>,
    }

    #[async_trait]
    impl SessionApi for Recorder {
        async fn start_upload(&self, _name: &str) -> Result<StartUploadResponse> {
            unreachable!("the scheduler never starts uploads")
        }

        async fn upload_part(
            &self,
            _key: &str,
            _upload_id: &str,
            part_number: i32,
            data: Bytes,
        ) -> Result<UploadPartResponse> {
            self.calls.lock().unwrap().push((part_number, data));
            if Some(part_number) == self.fail_at {
                return Err(Error::Api {
                    status: 500,
                    body: String::from("boom"),
                });
            }
            Ok(UploadPartResponse {
                etag: format!("etag-{part_number}"),
            })
        }

        async fn complete_upload(
            &self,
            _key: &str,
            _upload_id: &str,
            _parts: Vec<PartRecord>,
        ) -> Result<CompleteUploadResponse> {
            unreachable!("the scheduler never completes uploads")
        }

        async fn list_files(&self) -> Result<Vec<FileEntry>> {
            Ok(vec![])
        }
    }

    fn session() -> UploadSession {
        UploadSession::open(StartUploadResponse {
            key: String::from("1-f"),
            upload_id: String::from("u"),
        })
    }

    #[tokio::test]
    async fn uploads_parts_in_order() {
        let api = Recorder::default();
        let mut source = Bytes::from_static(b"0123456789a");
        let scheduler = ChunkScheduler::new(PartPlan::new(source.len() as u64, 4).unwrap());
        let mut session = session();
        let acked = Arc::new(Mutex::new(Vec::new()));
        let acked_clone = acked.clone();

        scheduler
            .run(&api, &mut session, &mut source, move |n| {
                acked_clone.lock().unwrap().push(n)
            })
            .await
            .unwrap();

        let calls = api.calls.lock().unwrap();
        let numbers: Vec<i32> = calls.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(calls[2].1, Bytes::from_static(b"89a"));
        assert_eq!(*acked.lock().unwrap(), vec![1, 2, 3]);

        let recorded: Vec<i32> = session.parts().iter().map(|p| p.part_number).collect();
        assert_eq!(recorded, vec![1, 2, 3]);
        assert_eq!(session.parts()[0].etag, "etag-1");
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let api = Recorder {
            fail_at: Some(2),
            ..Default::default()
        };
        let mut source = Bytes::from_static(b"0123456789a");
        let scheduler = ChunkScheduler::new(PartPlan::new(source.len() as u64, 4).unwrap());
        let mut session = session();

        let err = scheduler
            .run(&api, &mut session, &mut source, |_| {})
            .await
            .unwrap_err();

        match err {
            Error::PartFailed {
                part_number,
                total_parts,
                ..
            } => {
                assert_eq!(part_number, 2);
                assert_eq!(total_parts, 3);
            }
            e => panic!("expected part failure, got {e:?}"),
        }
        // part 3 is never attempted and part 2 is never recorded
        assert_eq!(api.calls.lock().unwrap().len(), 2);
        assert_eq!(session.parts().len(), 1);
    }

    #[tokio::test]
    async fn rejects_source_of_wrong_size() {
        let api = Recorder::default();
        let mut source = Bytes::from_static(b"0123");
        let scheduler = ChunkScheduler::new(PartPlan::new(10, 4).unwrap());

        let err = scheduler
            .run(&api, &mut session(), &mut source, |_| {})
            .await
            .unwrap_err();

        match err {
            Error::SizeMismatch { planned, actual } => assert_eq!((planned, actual), (10, 4)),
            e => panic!("expected size mismatch, got {e:?}"),
        }
        assert!(api.calls.lock().unwrap().is_empty());
    }
}
