mod config;
pub use config::Config;

mod errors;
pub use errors::{Error, Result};

pub mod client;
pub mod http;
pub mod keys;
pub mod objects;
pub mod plan;
pub mod session;
pub mod types;

pub use plan::{PartPlan, PartRange};
pub use session::{UploadSession, UploadSessions};
