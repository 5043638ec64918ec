//! Upload service runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the handler, the file
//! store and the audit logger. Nothing in this crate reads environment variables during request
//! handling; the `*_from_env_value` helpers take the raw value so binaries own the environment
//! and tests can point the service at a temporary directory.

use crate::constants::{AUDIT_LOG_FILENAME, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOADS_DIR};
use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the client-supplied filename is embedded in the stored filename.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilenamePolicy {
    /// Replace path separators and reserved characters, drop control characters, cap length.
    #[default]
    Sanitise,
    /// Embed the client filename unchanged.
    ///
    /// The file store still refuses names that are not a single plain path component.
    Verbatim,
}

impl FromStr for FilenamePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sanitise" | "sanitize" => Ok(Self::Sanitise),
            "verbatim" => Ok(Self::Verbatim),
            other => Err(ConfigError::InvalidInput(format!(
                "unknown filename policy '{other}' (expected 'sanitise' or 'verbatim')"
            ))),
        }
    }
}

/// Upload configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    uploads_dir: PathBuf,
    filename_policy: FilenamePolicy,
    max_upload_bytes: usize,
}

impl UploadConfig {
    /// Create a new `UploadConfig`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidInput`] if `max_upload_bytes` is zero.
    pub fn new(
        uploads_dir: PathBuf,
        filename_policy: FilenamePolicy,
        max_upload_bytes: usize,
    ) -> ConfigResult<Self> {
        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidInput(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            uploads_dir,
            filename_policy,
            max_upload_bytes,
        })
    }

    /// Configuration with the default policy and body limit for the given directory.
    pub fn with_uploads_dir(uploads_dir: PathBuf) -> Self {
        Self {
            uploads_dir,
            filename_policy: FilenamePolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.uploads_dir.join(AUDIT_LOG_FILENAME)
    }

    pub fn filename_policy(&self) -> FilenamePolicy {
        self.filename_policy
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Create the uploads directory (and any missing parents).
    ///
    /// Idempotent; intended to run once at startup.
    pub fn ensure_uploads_dir(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.uploads_dir).map_err(ConfigError::UploadsDir)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the uploads directory from an optional raw value.
///
/// `None` or a blank value yields [`DEFAULT_UPLOADS_DIR`].
pub fn uploads_dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR))
}

/// Parse the filename policy from an optional raw value, defaulting to sanitising.
pub fn filename_policy_from_env_value(value: Option<String>) -> ConfigResult<FilenamePolicy> {
    Ok(non_blank(value)
        .map(|v| v.parse::<FilenamePolicy>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse the request body cap (bytes) from an optional raw value.
///
/// # Errors
/// Returns [`ConfigError::InvalidInput`] for non-numeric or zero values.
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> ConfigResult<usize> {
    let Some(raw) = non_blank(value) else {
        return Ok(DEFAULT_MAX_UPLOAD_BYTES);
    };

    match raw.parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidInput(
            "UPLOAD_MAX_BYTES must be greater than zero".into(),
        )),
        Ok(bytes) => Ok(bytes),
        Err(e) => Err(ConfigError::InvalidInput(format!(
            "UPLOAD_MAX_BYTES must be a byte count, got '{raw}': {e}"
        ))),
    }
}
