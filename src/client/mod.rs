//! The uploading side: splits a local source into parts and drives them through the upload API.
mod api;
pub use api::{HttpSessionApi, SessionApi};

mod errors;
pub use errors::{Error, Result};

mod source;
pub use source::{FileSource, PartSource};

pub mod orchestrator;
pub use orchestrator::{follow, UploadOrchestrator, UploadState, DEFAULT_CHUNK_SIZE};

pub mod scheduler;
pub use scheduler::ChunkScheduler;
