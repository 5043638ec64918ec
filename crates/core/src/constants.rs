//! Constants used throughout the upload core crate.
//!
//! Path, filename and form-field constants live here so the HTTP layer, the CLI and the core
//! agree on them.

/// Default directory for stored uploads when no explicit directory is configured.
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Filename of the append-only audit log inside the uploads directory.
pub const AUDIT_LOG_FILENAME: &str = "logs.txt";

/// Label recorded when the caller does not supply an EHR system.
pub const UNKNOWN_EHR_SYSTEM: &str = "Unknown";

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD_NAME: &str = "file";

/// Multipart field carrying the source-system label.
pub const EHR_SYSTEM_FIELD_NAME: &str = "ehrSystem";

/// Default request body cap (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Maximum UTF-8 length (bytes) of the client filename kept by the sanitising policy.
///
/// The generated prefix (`file-<millis>-<random>-`, at most 30 bytes) plus the temporary
/// `.` / `.part` affixes must still fit in a 255-byte file name.
pub const MAX_ORIGINAL_NAME_BYTES: usize = 200;

/// Exclusive upper bound of the random component in generated filenames.
pub const RANDOM_SUFFIX_BOUND: u32 = 1_000_000_000;

/// Suffix of in-flight upload files; they are hidden (dot-prefixed) until committed.
pub const TEMP_FILE_SUFFIX: &str = ".part";
