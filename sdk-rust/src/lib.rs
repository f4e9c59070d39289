mod client;
mod client_utils;
pub mod config;
mod context;
mod errors;
mod notice;
mod opentelemetry;
pub mod progress;
mod query;
pub mod synapse_test;
mod sync;
mod task_slot;
mod types;
mod upload;

pub use client::ApiClient;
pub use client_utils::extract_error_message;
pub use config::{ClientConfig, Endpoint, BASE_URL_ENV};
pub use context::{ContextStore, ProjectContext};
pub use errors::*;
pub use notice::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use query::{QueryOperation, QueryState};
pub use sync::{SyncOperation, SyncState, DEFAULT_GITHUB_BRANCH};
pub use task_slot::{SlotPermit, TaskSlot};
pub use types::*;
pub use upload::{UploadOperation, UploadState};
