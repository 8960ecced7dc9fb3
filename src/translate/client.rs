use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use super::interface::{TranslateRequest, TranslateResponse, TranslationJob, Translator};
use super::TRANSLATIONS_URL_PREFIX;
use crate::error::{AppError, UpstreamError};
use crate::extraction::DocumentChunk;
use crate::session::StoredFile;

const NO_TEXT_NOTICE: &str = "_No extractable text._";

/// Translator that sends every extracted chunk to an HTTP translation service
/// and writes one markdown artifact per stored file.
#[derive(Debug, Clone)]
pub struct ServiceTranslator {
    client: Client,
    base_url: String,
    output_root: PathBuf,
    concurrency: usize,
}

impl ServiceTranslator {
    pub fn new(
        base_url: impl Into<String>,
        output_root: impl Into<PathBuf>,
        concurrency: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            output_root: output_root.into(),
            concurrency: concurrency.max(1),
        })
    }

    async fn translate_text(
        &self,
        text: &str,
        language: &str,
        glossary: Option<&str>,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/translate", self.base_url);
        let request = TranslateRequest {
            text: text.to_string(),
            source_lang: None,
            target_lang: language.to_string(),
            glossary: glossary.map(|g| g.to_string()),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status, &body));
        }

        let result: TranslateResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Permanent(format!("Invalid translation response: {}", e)))?;

        if result.success {
            Ok(result.translated_text)
        } else {
            let error_msg = result.error.unwrap_or_else(|| "Unknown error".to_string());
            Err(UpstreamError::Permanent(error_msg))
        }
    }
}

#[async_trait]
impl Translator for ServiceTranslator {
    async fn translate(&self, job: TranslationJob<'_>) -> Result<Vec<String>, AppError> {
        info!(
            session_id = %job.session_id,
            language = job.language,
            files = job.files.len(),
            chunks = job.chunks.len(),
            "Translating session"
        );

        let requests: Vec<_> = job
            .chunks
            .iter()
            .map(|chunk| self.translate_text(&chunk.page_content, job.language, job.word_list))
            .collect();
        let translated: Vec<String> = stream::iter(requests)
            .buffered(self.concurrency)
            .try_collect()
            .await
            .map_err(|e| AppError::upstream("Translation failed", e))?;

        let out_dir = self.output_root.join(job.session_id.to_string());
        fs::create_dir_all(&out_dir).await.map_err(|e| {
            AppError::storage("Failed to create translation output directory", e)
        })?;

        let translated_at = chrono::Utc::now().to_rfc3339();
        let mut urls = Vec::new();
        for (source, texts) in group_by_file(job.files, job.chunks, translated) {
            let out_name = format!("{}.{}.md", source, job.language);
            let content = if texts.is_empty() {
                NO_TEXT_NOTICE.to_string()
            } else {
                texts.join("\n\n")
            };
            let body = format!(
                "<!-- {} translated to {} at {} -->\n\n{}\n",
                source, job.language, translated_at, content
            );
            fs::write(out_dir.join(&out_name), body)
                .await
                .map_err(|e| AppError::storage(format!("Failed to write {}", out_name), e))?;

            debug!(session_id = %job.session_id, file = %out_name, "Wrote translation");
            urls.push(format!(
                "/{}/{}/{}",
                TRANSLATIONS_URL_PREFIX,
                job.session_id,
                urlencoding::encode(&out_name)
            ));
        }

        Ok(urls)
    }
}

/// Pair translated texts with their source file. Every stored file gets a group,
/// even without text; chunks from unknown sources follow in first-seen order.
fn group_by_file(
    files: &[StoredFile],
    chunks: &[DocumentChunk],
    translated: Vec<String>,
) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = files
        .iter()
        .map(|file| (file.filename.clone(), Vec::new()))
        .collect();
    for (chunk, text) in chunks.iter().zip(translated) {
        let source = chunk.filename().unwrap_or("document").to_string();
        match groups.iter_mut().find(|(name, _)| *name == source) {
            Some((_, texts)) => texts.push(text),
            None => groups.push((source, vec![text])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use serde_json::{json, Map, Value};
    use std::path::Path;

    fn chunk(filename: &str, text: &str) -> DocumentChunk {
        let mut metadata = Map::new();
        metadata.insert("filename".into(), Value::String(filename.into()));
        DocumentChunk {
            page_content: text.into(),
            metadata,
        }
    }

    fn stored(filename: &str) -> StoredFile {
        StoredFile {
            filename: filename.into(),
            path: Path::new("ignored").join(filename),
            size: 1,
        }
    }

    #[test]
    fn groups_keep_file_order() {
        let chunks = vec![
            chunk("b.txt", "1"),
            chunk("a.txt", "2"),
            chunk("b.txt", "3"),
        ];
        let groups = group_by_file(&[], &chunks, vec!["uno".into(), "dos".into(), "tres".into()]);
        assert_eq!(
            groups,
            vec![
                ("b.txt".to_string(), vec!["uno".to_string(), "tres".to_string()]),
                ("a.txt".to_string(), vec!["dos".to_string()]),
            ]
        );
    }

    #[test]
    fn chunks_without_filename_share_a_group() {
        let chunks = vec![DocumentChunk {
            page_content: "x".into(),
            metadata: json!({}).as_object().unwrap().clone(),
        }];
        let groups = group_by_file(&[], &chunks, vec!["y".into()]);
        assert_eq!(groups[0].0, "document");
    }

    #[test]
    fn files_without_text_still_get_a_group() {
        let files = vec![stored("a.txt"), stored("scan.pdf")];
        let groups = group_by_file(&files, &[chunk("a.txt", "hi")], vec!["hola".into()]);
        assert_eq!(
            groups,
            vec![
                ("a.txt".to_string(), vec!["hola".to_string()]),
                ("scan.pdf".to_string(), vec![]),
            ]
        );
    }

    #[tokio::test]
    async fn every_stored_file_yields_an_artifact() {
        let output_root = PathBuf::from(format!("target/test-translations-{}", uuid::Uuid::new_v4()));
        // No chunks, so the service is never contacted.
        let translator =
            ServiceTranslator::new("http://127.0.0.1:9", &output_root, 2, Duration::from_secs(1))
                .unwrap();
        let id = SessionId::generate();
        let files = vec![stored("번역 문서.pdf")];

        let urls = translator
            .translate(TranslationJob {
                session_id: &id,
                language: "es",
                word_list: None,
                files: &files,
                chunks: &[],
            })
            .await
            .unwrap();

        assert_eq!(
            urls,
            vec![format!(
                "/translations/{}/%EB%B2%88%EC%97%AD%20%EB%AC%B8%EC%84%9C.pdf.es.md",
                id
            )]
        );
        let written = fs::read_to_string(output_root.join(id.to_string()).join("번역 문서.pdf.es.md"))
            .await
            .unwrap();
        assert!(written.contains(NO_TEXT_NOTICE));

        let _ = fs::remove_dir_all(&output_root).await;
    }
}
