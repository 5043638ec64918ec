//! # Upload Core
//!
//! Core logic for the EHR upload service:
//! - Startup configuration (`UploadConfig`)
//! - Stored filename generation and sanitising
//! - Source-system label resolution
//! - Streaming persistence into the uploads directory (`FileStore`)
//! - The append-only audit log (`AuditLogger`)
//!
//! **No API concerns**: multipart parsing, HTTP status mapping and servers belong in `api-rest`.

pub mod audit;
pub mod config;
pub mod constants;
pub mod ehr_system;
pub mod error;
pub mod filename;
pub mod storage;

pub use audit::{AuditEntry, AuditLogger};
pub use config::{FilenamePolicy, UploadConfig};
pub use constants::{DEFAULT_UPLOADS_DIR, UNKNOWN_EHR_SYSTEM};
pub use ehr_system::resolve_ehr_system;
pub use error::{AuditError, AuditResult, ConfigError, ConfigResult, UploadError, UploadResult};
pub use filename::new_stored_filename;
pub use storage::{FileStore, PendingFile, StoredFile};
