use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::client::ServiceTranslator;
use super::interface::Translator;
use super::placeholder::PlaceholderTranslator;
use crate::config::{TranslationConfig, TranslationProvider};

/// Factory for creating translators
pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create(config: &TranslationConfig) -> Result<Arc<dyn Translator>> {
        info!("Initializing translator: {:?}", config.provider);

        match config.provider {
            TranslationProvider::Placeholder => Ok(Arc::new(PlaceholderTranslator)),
            TranslationProvider::Service => {
                let service_url = config.service_url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("translation.service_url is required for the service provider")
                })?;
                Ok(Arc::new(ServiceTranslator::new(
                    service_url,
                    &config.output_directory,
                    config.concurrency,
                    Duration::from_secs(config.timeout_secs),
                )?))
            }
        }
    }
}
