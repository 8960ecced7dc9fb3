use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{multipart, Client};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::interface::{DocumentChunk, DocumentLoader};
use crate::config::ExtractionConfig;
use crate::error::UpstreamError;

const PARTITION_PATH: &str = "/general/v0/general";

/// Client for the Unstructured partition API.
#[derive(Debug, Clone)]
pub struct UnstructuredClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    strategy: String,
    max_retries: u32,
    initial_backoff: Duration,
    deadline: Duration,
}

/// Element as returned by the partition endpoint.
#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    category: Option<String>,
    element_id: Option<String>,
    text: Option<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, Value>,
}

impl UnstructuredClient {
    pub fn new(config: &ExtractionConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: partition_endpoint(&config.api_url),
            api_key: config.api_key.clone(),
            strategy: config.strategy.clone(),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            deadline: config.max_elapsed(),
        })
    }

    /// Cap the time spent loading one directory, retries included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.initial_backoff.max(Duration::from_secs(10)))
            .with_max_elapsed_time(Some(self.deadline))
            .build()
    }

    /// Partition one file, retrying transient failures up to `max_retries` times.
    pub async fn partition_file(&self, path: &Path) -> Result<Vec<DocumentChunk>, UpstreamError> {
        let content = tokio::fs::read(path).await.map_err(|e| {
            UpstreamError::Permanent(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let max_retries = self.max_retries;
        let mut attempt = 0u32;
        let elements = retry(self.backoff_policy(), || {
            attempt += 1;
            let current = attempt;
            let content = content.clone();
            let filename = filename.clone();
            async move {
                self.post_partition(&filename, content).await.map_err(|e| {
                    if e.is_retryable() && current <= max_retries {
                        warn!(
                            filename = %filename,
                            attempt = current,
                            error = %e,
                            "Extraction failed, retrying"
                        );
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await?;

        let source = absolute(path);
        let chunks: Vec<DocumentChunk> = elements
            .into_iter()
            .filter_map(|element| to_chunk(element, &source, &filename))
            .collect();

        debug!(filename = %filename, chunks = chunks.len(), "Partitioned file");
        Ok(chunks)
    }

    async fn post_partition(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Vec<Element>, UpstreamError> {
        let part = multipart::Part::bytes(content).file_name(filename.to_string());
        let form = multipart::Form::new()
            .part("files", part)
            .text("strategy", self.strategy.clone());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("unstructured-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status, &body));
        }

        response
            .json::<Vec<Element>>()
            .await
            .map_err(|e| UpstreamError::Permanent(format!("Invalid extraction response: {}", e)))
    }
}

#[async_trait]
impl DocumentLoader for UnstructuredClient {
    async fn load(&self, directory: &Path) -> Result<Vec<DocumentChunk>, UpstreamError> {
        let files = list_directory(directory).await?;
        info!(
            directory = %directory.display(),
            files = files.len(),
            "Loading documents through extraction service"
        );

        let partition_all = async {
            let mut chunks = Vec::new();
            for path in &files {
                chunks.extend(self.partition_file(path).await?);
            }
            Ok::<_, UpstreamError>(chunks)
        };

        match tokio::time::timeout(self.deadline, partition_all).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    directory = %directory.display(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Extraction deadline exceeded"
                );
                Err(UpstreamError::Transient(format!(
                    "extraction did not finish within {:?}",
                    self.deadline
                )))
            }
        }
    }
}

fn partition_endpoint(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if base.ends_with(PARTITION_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, PARTITION_PATH)
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn to_chunk(element: Element, source: &Path, filename: &str) -> Option<DocumentChunk> {
    let text = element.text.filter(|text| !text.trim().is_empty())?;
    let mut metadata = element.metadata;
    metadata.insert(
        "source".to_string(),
        Value::String(source.display().to_string()),
    );
    metadata.insert("filename".to_string(), Value::String(filename.to_string()));
    if let Some(category) = element.category {
        metadata.insert("category".to_string(), Value::String(category));
    }
    if let Some(element_id) = element.element_id {
        metadata.insert("element_id".to_string(), Value::String(element_id));
    }
    Some(DocumentChunk {
        page_content: text,
        metadata,
    })
}

async fn list_directory(directory: &Path) -> Result<Vec<PathBuf>, UpstreamError> {
    let read_error = |e: std::io::Error| {
        UpstreamError::Permanent(format!(
            "Failed to read directory {}: {}",
            directory.display(),
            e
        ))
    };

    let mut entries = tokio::fs::read_dir(directory).await.map_err(read_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file && !hidden {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
