//! Upload lifecycle.
//!
//! [`UploadOrchestrator`] drives one upload at a time through
//! `Idle -> Initiating -> UploadingPart(n) -> Completing -> Succeeded`, dropping to `Failed` on
//! the first error. Both `Succeeded` and `Failed` are terminal; [`UploadOrchestrator::reset`] is
//! the only way back to `Idle`. The current state is published on a [`tokio::sync::watch`]
//! channel so a UI can render progress while the upload is suspended on I/O.
use std::fmt;

use tokio::sync::watch;

use super::api::SessionApi;
use super::errors::{Error, Result};
use super::scheduler::ChunkScheduler;
use super::source::PartSource;
use crate::plan::PartPlan;
use crate::session::UploadSession;

/// Default part size, 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Initiating,
    /// Part `part_number` of `total_parts` is in flight.
    UploadingPart {
        part_number: i32,
        total_parts: usize,
    },
    Completing,
    Succeeded {
        location: String,
    },
    Failed {
        message: String,
        /// `(part_number, total_parts)` when a part upload failed.
        at_part: Option<(i32, usize)>,
    },
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Succeeded { .. } | UploadState::Failed { .. }
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UploadState::Idle => write!(f, "select a file to upload"),
            UploadState::Initiating => write!(f, "initializing upload..."),
            UploadState::UploadingPart {
                part_number,
                total_parts,
            } => write!(f, "uploading part {part_number}/{total_parts}..."),
            UploadState::Completing => write!(f, "completing upload..."),
            UploadState::Succeeded { location } => write!(f, "upload succeeded: {location}"),
            UploadState::Failed { message, .. } => write!(f, "error: {message}"),
        }
    }
}

pub struct UploadOrchestrator<A> {
    api: A,
    chunk_size: u64,
    state: watch::Sender<UploadState>,
}

impl<A: SessionApi> UploadOrchestrator<A> {
    pub fn new(api: A, chunk_size: u64) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            api,
            chunk_size,
            state,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    /// Return to `Idle` after a finished upload. Refused while an upload is running.
    pub fn reset(&self) -> Result<()> {
        let state = self.state();
        if state != UploadState::Idle && !state.is_terminal() {
            return Err(Error::Busy);
        }
        self.transition(UploadState::Idle);
        Ok(())
    }

    /// Upload `source` as `name` and return its public location.
    ///
    /// Requires the orchestrator to be `Idle`. Any error leaves it in `Failed`; the store-side
    /// session is abandoned, not aborted.
    pub async fn upload<S>(&self, name: &str, source: &mut S) -> Result<String>
    where
        S: PartSource + ?Sized,
    {
        let claimed = self.state.send_if_modified(|state| {
            if *state != UploadState::Idle {
                return false;
            }
            *state = UploadState::Initiating;
            true
        });
        if !claimed {
            return Err(Error::Busy);
        }
        tracing::debug!("{}", UploadState::Initiating);

        match self.run(name, source).await {
            Ok(location) => {
                self.transition(UploadState::Succeeded {
                    location: location.clone(),
                });
                Ok(location)
            }
            Err(e) => {
                let at_part = match &e {
                    Error::PartFailed {
                        part_number,
                        total_parts,
                        ..
                    } => Some((*part_number, *total_parts)),
                    _ => None,
                };
                tracing::warn!("upload of {name} failed: {e}");
                self.transition(UploadState::Failed {
                    message: e.to_string(),
                    at_part,
                });
                Err(e)
            }
        }
    }

    async fn run<S>(&self, name: &str, source: &mut S) -> Result<String>
    where
        S: PartSource + ?Sized,
    {
        if source.size() == 0 {
            return Err(Error::EmptyFile);
        }
        let plan = PartPlan::new(source.size(), self.chunk_size)?;
        let total_parts = plan.len();

        let started = self.api.start_upload(name).await?;
        let mut session = UploadSession::open(started);
        tracing::info!(
            key = session.key(),
            upload_id = session.upload_id(),
            total_parts,
            "upload started"
        );

        self.transition(UploadState::UploadingPart {
            part_number: 1,
            total_parts,
        });
        let scheduler = ChunkScheduler::new(plan);
        scheduler
            .run(&self.api, &mut session, source, |acknowledged| {
                if (acknowledged as usize) < total_parts {
                    self.transition(UploadState::UploadingPart {
                        part_number: acknowledged + 1,
                        total_parts,
                    });
                } else {
                    self.transition(UploadState::Completing);
                }
            })
            .await?;

        let parts = session.begin_completion()?;
        let completed = self
            .api
            .complete_upload(session.key(), session.upload_id(), parts)
            .await?;
        session.mark_completed();
        Ok(completed.location)
    }

    fn transition(&self, next: UploadState) {
        tracing::debug!("{next}");
        self.state.send_replace(next);
    }
}

/// Call `on_state` with every state `states` observes until a terminal one.
///
/// Intermediate states may be skipped when they change faster than they are observed; the last
/// state seen is terminal unless the orchestrator was dropped first.
pub async fn follow<F>(mut states: watch::Receiver<UploadState>, mut on_state: F)
where
    F: FnMut(&UploadState),
{
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        on_state(&state);
        if state.is_terminal() {
            break;
        }
    }
}
