use async_trait::async_trait;
use tracing::info;

use super::interface::{TranslationJob, Translator};
use crate::error::AppError;

/// Result returned while no translation provider is configured.
pub const PLACEHOLDER_RESULT: &str = "fff.md";

/// Translator that does not translate yet.
///
/// Extraction still runs, so upstream failures surface exactly as they would
/// with a real provider, but the returned URL list is fixed.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderTranslator;

#[async_trait]
impl Translator for PlaceholderTranslator {
    async fn translate(&self, job: TranslationJob<'_>) -> Result<Vec<String>, AppError> {
        info!(
            session_id = %job.session_id,
            language = job.language,
            word_list = job.word_list.unwrap_or(""),
            files = job.files.len(),
            chunks = job.chunks.len(),
            "Translation not implemented, returning placeholder result"
        );
        Ok(vec![PLACEHOLDER_RESULT.to_string()])
    }
}
