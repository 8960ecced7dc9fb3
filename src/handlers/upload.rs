use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::error::AppError;
use crate::session::{filename::sanitize_filename, SessionId, SessionStore};
use crate::state::AppState;

/// Multipart field carrying the uploaded files.
pub const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: SessionId,
    pub file_urls: Vec<String>,
}

struct PendingFile {
    filename: String,
    content: Vec<u8>,
}

pub async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::Validation(e.body_text())
        }
    })?;
    let pending = read_files(&state, &mut multipart).await?;

    if pending.is_empty() {
        return Err(AppError::Validation("Please upload a file".to_string()));
    }

    let session_id = state.sessions.create_session().await?;
    let file_urls = store_batch(
        &state.sessions,
        &session_id,
        &pending,
        state.config.upload.url_prefix(),
    )
    .await?;

    info!(
        session_id = %session_id,
        files = file_urls.len(),
        "Upload completed"
    );

    Ok(Json(UploadResponse {
        session_id,
        file_urls,
    }))
}

/// Write a batch into a fresh session. Any failure discards the whole session.
///
/// Parts sharing a name overwrite each other, so each stored file is reported once.
async fn store_batch(
    sessions: &SessionStore,
    session_id: &SessionId,
    pending: &[PendingFile],
    url_prefix: &str,
) -> Result<Vec<String>, AppError> {
    let mut file_urls: Vec<String> = Vec::with_capacity(pending.len());

    for file in pending {
        match sessions
            .write_file(session_id, &file.filename, &file.content)
            .await
        {
            Ok(stored) => {
                let url = stored.url(url_prefix, session_id);
                if !file_urls.contains(&url) {
                    file_urls.push(url);
                }
            }
            Err(e) => {
                if let Err(cleanup) = sessions.discard_session(session_id).await {
                    error!(session_id = %session_id, error = %cleanup, "Failed to roll back upload");
                }
                return Err(e);
            }
        }
    }

    Ok(file_urls)
}

/// Buffer every `files` part, enforcing name and size limits as parts arrive.
async fn read_files(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<Vec<PendingFile>, AppError> {
    let upload = &state.config.upload;
    let mut pending = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let raw_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("File part is missing a file name".to_string()))?;
        let filename = sanitize_filename(&raw_name)?;
        if !upload.is_extension_allowed(&filename) {
            return Err(AppError::Validation(format!(
                "File type not allowed: {}",
                filename
            )));
        }

        let mut content = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if (content.len() + chunk.len()) as u64 > upload.max_file_size_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "{} exceeds the {} byte limit",
                    filename, upload.max_file_size_bytes
                )));
            }
            content.extend_from_slice(&chunk);
        }

        pending.push(PendingFile { filename, content });
    }

    Ok(pending)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}
