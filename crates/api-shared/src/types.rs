//! JSON bodies exchanged by the upload API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message returned with every successful upload.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

/// Error returned when the request carries no file part.
pub const NO_FILE_UPLOADED: &str = "No file uploaded";

/// Error returned for every other upload failure. Details stay in the server log.
pub const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
}

/// Successful upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRes {
    pub message: String,
    /// Generated on-disk filename
    pub filename: String,
    /// Resolved source-system label (`Unknown` when not supplied)
    pub ehr_system: String,
}

impl UploadRes {
    pub fn uploaded(filename: String, ehr_system: String) -> Self {
        Self {
            message: UPLOAD_SUCCESS_MESSAGE.into(),
            filename,
            ehr_system,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// `multipart/form-data` body accepted by `POST /upload`.
///
/// Only used to describe the form in the OpenAPI document; the handler reads the parts as a
/// stream.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    /// The file to store
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Source EHR system label
    pub ehr_system: Option<String>,
}
