//! `POST /upload`.
//!
//! The multipart body is read as a stream. The first part named `file` that carries a filename
//! is written to a temporary file in the uploads directory; the `ehrSystem` text field may come
//! before or after it. Only once the whole body has been read is the file committed and the
//! audit line appended.

use crate::AppState;
use api_shared::{ErrorRes, UploadRes, NO_FILE_UPLOADED, UPLOAD_FAILED};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::Json,
};
use upload_core::constants::{EHR_SYSTEM_FIELD_NAME, FILE_FIELD_NAME};
use upload_core::{
    new_stored_filename, resolve_ehr_system, AuditEntry, FileStore, FilenamePolicy, PendingFile,
    StoredFile, UploadError, UploadResult,
};

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = api_shared::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded", body = UploadRes),
        (status = 400, description = "No file uploaded", body = ErrorRes),
        (status = 500, description = "Upload failed", body = ErrorRes)
    )
)]
/// Store one uploaded file and record it in the audit log.
///
/// # Returns
/// * `Ok(Json<UploadRes>)` - Generated filename and resolved EHR system label
/// * `Err((StatusCode, Json<ErrorRes>))` - 400 when no file part is present, 500 otherwise
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the body is not multipart, or
/// - no part named `file` carries a filename.
///
/// Returns `500 Internal Server Error` if:
/// - the multipart body is malformed or exceeds the body limit,
/// - a second file part is sent, or
/// - the file cannot be written.
///
/// Audit log failures are logged and do not affect the response.
#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadRes>, (StatusCode, Json<ErrorRes>)> {
    let (stored, ehr_system) = match receive_upload(&state, multipart).await {
        Ok(received) => received,
        Err(UploadError::NoFile) => {
            return Err((StatusCode::BAD_REQUEST, Json(ErrorRes::new(NO_FILE_UPLOADED))));
        }
        Err(e) => {
            tracing::error!("Upload error: {:?}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes::new(UPLOAD_FAILED)),
            ));
        }
    };

    // The file is already durable; an audit failure is reported to operators and dropped.
    let entry = AuditEntry::new(stored.filename.clone(), ehr_system.clone());
    if let Err(e) = state.audit_logger.append(&entry).await {
        tracing::error!("Error writing to audit log: {:?}", e);
    }

    tracing::info!(
        filename = %stored.filename,
        ehr_system = %ehr_system,
        bytes = stored.size_bytes,
        "stored upload"
    );

    Ok(Json(UploadRes::uploaded(stored.filename, ehr_system)))
}

async fn receive_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadResult<(StoredFile, String)> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("request is not multipart: {}", rejection);
            return Err(UploadError::NoFile);
        }
    };

    let mut form = UploadFormReader::default();
    if let Err(e) = form
        .read(&mut multipart, &state.file_store, state.cfg.filename_policy())
        .await
    {
        form.abort().await;
        return Err(e);
    }

    let UploadFormReader { pending, ehr_system } = form;
    let pending = pending.ok_or(UploadError::NoFile)?;
    let stored = pending.commit().await?;

    Ok((stored, resolve_ehr_system(ehr_system)))
}

/// Fields collected from the multipart stream.
#[derive(Default)]
struct UploadFormReader {
    pending: Option<PendingFile>,
    ehr_system: Option<String>,
}

impl UploadFormReader {
    async fn read(
        &mut self,
        multipart: &mut Multipart,
        store: &FileStore,
        policy: FilenamePolicy,
    ) -> UploadResult<()> {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?
        {
            let field_name = field.name().unwrap_or_default().to_string();

            // An empty filename means no file was chosen in the form.
            match field
                .file_name()
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
            {
                Some(original) => {
                    if field_name != FILE_FIELD_NAME || self.pending.is_some() {
                        return Err(UploadError::UnexpectedFile(field_name));
                    }

                    let stored_name = new_stored_filename(&field_name, &original, policy);
                    let pending = self.pending.insert(store.begin(stored_name).await?);

                    while let Some(chunk) = field
                        .chunk()
                        .await
                        .map_err(|e| UploadError::Multipart(e.to_string()))?
                    {
                        pending.write_chunk(&chunk).await?;
                    }
                }
                None if field_name == EHR_SYSTEM_FIELD_NAME => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| UploadError::Multipart(e.to_string()))?;
                    self.ehr_system = Some(value);
                }
                None => {
                    // Unknown text fields are ignored
                }
            }
        }

        Ok(())
    }

    async fn abort(self) {
        if let Some(pending) = self.pending {
            pending.abort().await;
        }
    }
}
