use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extraction::DocumentChunk;
use crate::session::{SessionId, StoredFile};

/// Translate interface - the translation itself happens in an external service

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: Option<String>,
    pub target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glossary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Everything a translator needs for one session.
#[derive(Debug)]
pub struct TranslationJob<'a> {
    pub session_id: &'a SessionId,
    pub language: &'a str,
    pub word_list: Option<&'a str>,
    /// Files stored in the session, in listing order.
    pub files: &'a [StoredFile],
    pub chunks: &'a [DocumentChunk],
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate the job's chunks and return where the results can be downloaded.
    async fn translate(&self, job: TranslationJob<'_>) -> Result<Vec<String>, AppError>;
}
