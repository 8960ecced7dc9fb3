use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub extraction: ExtractionConfig,
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

/// Options handed to the upload handler and the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub root_directory: String,
    /// First path segment of the URLs returned for stored files.
    pub url_prefix: String,
    pub max_file_size_bytes: u64,
    pub max_request_bytes: usize,
    /// Lowercase extensions without the dot. Empty accepts everything.
    pub allowed_extensions: BTreeSet<String>,
    pub hash_suffix_filenames: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub strategy: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Upper bound for extracting a whole session, retries included.
    pub max_elapsed_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    Placeholder,
    Service,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub provider: TranslationProvider,
    pub service_url: Option<String>,
    pub output_directory: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 300,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root_directory: "public/uploads".to_string(),
            url_prefix: "uploads".to_string(),
            max_file_size_bytes: 20 * 1024 * 1024,
            max_request_bytes: 100 * 1024 * 1024,
            allowed_extensions: default_allowed_extensions(),
            hash_suffix_filenames: false,
        }
    }
}

fn default_allowed_extensions() -> BTreeSet<String> {
    [
        "txt", "md", "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "csv", "tsv", "html",
        "htm", "xml", "json", "rtf", "odt", "epub", "eml", "msg", "rst", "org",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_key: None,
            strategy: "auto".to_string(),
            timeout_secs: 120,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_elapsed_secs: 240,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::Placeholder,
            service_url: None,
            output_directory: "public/translations".to_string(),
            concurrency: 4,
            timeout_secs: 60,
        }
    }
}

impl UploadConfig {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root_directory)
    }

    /// URL segment for stored uploads, without slashes.
    pub fn url_prefix(&self) -> &str {
        match self.url_prefix.trim_matches('/') {
            "" => "uploads",
            prefix => prefix,
        }
    }

    pub fn is_extension_allowed(&self, filename: &str) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.allowed_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs.max(1))
    }
}

impl Config {
    /// Load configuration from an optional file, then `APP__SECTION__FIELD`
    /// environment variables, then the Unstructured variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_extensions")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config.with_unstructured_env())
    }

    /// Time budget for extracting one session. Always ends before the
    /// server-wide request timeout.
    pub fn extraction_deadline(&self) -> Duration {
        let request_timeout = Duration::from_secs(self.server.request_timeout_secs);
        let headroom = request_timeout
            .saturating_sub(Duration::from_secs(1))
            .max(Duration::from_millis(500));
        self.extraction.max_elapsed().min(headroom)
    }

    /// Parse configuration from an in-memory document.
    pub fn from_content(content: &str, format: config::FileFormat) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(content, format))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    fn with_unstructured_env(mut self) -> Self {
        if let Ok(url) = std::env::var("UNSTRUCTURED_API_URL") {
            if !url.trim().is_empty() {
                self.extraction.api_url = url;
            }
        }
        if let Ok(key) = std::env::var("UNSTRUCTURED_API_KEY") {
            if !key.trim().is_empty() {
                self.extraction.api_key = Some(key);
            }
        }
        self
    }
}
