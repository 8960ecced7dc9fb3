use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::UpstreamError;

/// One piece of text extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub page_content: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentChunk {
    /// Name of the uploaded file this chunk came from.
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename").and_then(|v| v.as_str())
    }
}

/// Document extraction interface - parsing happens in an external service
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Extract the text of every file in `directory`.
    async fn load(&self, directory: &Path) -> Result<Vec<DocumentChunk>, UpstreamError>;
}
