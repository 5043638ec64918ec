use std::path::PathBuf;

/// Errors raised while receiving and persisting a single upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    NoFile,
    #[error("failed to parse multipart body: {0}")]
    Multipart(String),
    #[error("unexpected file part in field '{0}'")]
    UnexpectedFile(String),
    #[error("generated filename is not a plain file name: {0}")]
    InvalidStoredName(String),
    #[error("failed to persist upload: {0}")]
    Persistence(#[from] std::io::Error),
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Errors raised by the audit log.
///
/// Append failures are reported to the caller but are never allowed to fail the upload that
/// triggered them; see the `/upload` handler.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to append to audit log (path: {path}): {source}", path = path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read audit log: {0}")]
    Read(std::io::Error),
    #[error("malformed audit line: {0}")]
    Parse(String),
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;

/// Errors raised while resolving configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create uploads directory: {0}")]
    UploadsDir(std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
