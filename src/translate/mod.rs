pub mod client;
pub mod factory;
pub mod interface;
pub mod placeholder;

pub use client::ServiceTranslator;
pub use factory::TranslatorFactory;
pub use interface::{TranslationJob, Translator};
pub use placeholder::{PlaceholderTranslator, PLACEHOLDER_RESULT};

/// URL segment under which translated artifacts are served.
pub const TRANSLATIONS_URL_PREFIX: &str = "translations";
