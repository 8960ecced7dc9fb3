use std::sync::Arc;

use crate::config::Config;
use crate::extraction::{DocumentLoader, UnstructuredClient};
use crate::session::SessionStore;
use crate::translate::{Translator, TranslatorFactory};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub loader: Arc<dyn DocumentLoader>,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let sessions = SessionStore::open(
            config.upload.root_path(),
            config.upload.hash_suffix_filenames,
        )
        .await?;
        let loader = Arc::new(
            UnstructuredClient::new(&config.extraction)?.with_deadline(config.extraction_deadline()),
        );
        let translator = TranslatorFactory::create(&config.translation)?;

        Ok(Self::with_parts(config, sessions, loader, translator))
    }

    /// Assemble state from already-built collaborators.
    pub fn with_parts(
        config: Config,
        sessions: SessionStore,
        loader: Arc<dyn DocumentLoader>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            loader,
            translator,
        }
    }
}
