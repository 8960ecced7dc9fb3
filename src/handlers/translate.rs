use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::info;

use crate::error::AppError;
use crate::session::SessionId;
use crate::state::AppState;
use crate::translate::TranslationJob;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
    #[serde(alias = "uniqueId")]
    pub session_id: Option<String>,
    #[serde(alias = "wordlist")]
    pub word_list: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResult {
    pub file_urls: Vec<String>,
}

fn language_code() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})*$").unwrap())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn translate_session(
    State(state): State<AppState>,
    body: Result<Json<TranslateBody>, JsonRejection>,
) -> Result<Json<TranslateResult>, AppError> {
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let (Some(raw_session_id), Some(language)) =
        (non_blank(body.session_id), non_blank(body.language))
    else {
        return Err(AppError::Validation(
            "Missing sessionId or language".to_string(),
        ));
    };
    if !language_code().is_match(&language) {
        return Err(AppError::Validation(format!(
            "Unsupported language code: {}",
            language
        )));
    }

    let session_id: SessionId = raw_session_id
        .parse()
        .map_err(|_| AppError::NotFound(format!("Session {} not found", raw_session_id)))?;
    let files = state.sessions.list_files(&session_id).await?;
    let word_list = non_blank(body.word_list);

    info!(
        session_id = %session_id,
        language = %language,
        files = files.len(),
        "Translation requested"
    );

    let chunks = state
        .loader
        .load(&state.sessions.session_dir(&session_id))
        .await
        .map_err(|e| AppError::upstream("Document extraction failed", e))?;

    let file_urls = state
        .translator
        .translate(TranslationJob {
            session_id: &session_id,
            language: &language,
            word_list: word_list.as_deref(),
            files: &files,
            chunks: &chunks,
        })
        .await?;

    Ok(Json(TranslateResult { file_urls }))
}
