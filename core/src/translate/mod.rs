pub mod google;

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::is_storable_field;

pub use google::GoogleTranslator;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("translation provider returned HTTP {0}")]
    Status(u16),
    #[error("unexpected translation response: {0}")]
    Malformed(String),
    #[error("translator reported an error: {0}")]
    Failure(String),
}

/// Target languages, in the column order of the localization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    French,
    German,
    Spanish,
    Italian,
    Russian,
    Portuguese,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::French,
        Language::German,
        Language::Spanish,
        Language::Italian,
        Language::Russian,
        Language::Portuguese,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::German => "de",
            Language::Spanish => "es",
            Language::Italian => "it",
            Language::Russian => "ru",
            Language::Portuguese => "pt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::French => "French",
            Language::German => "German",
            Language::Spanish => "Spanish",
            Language::Italian => "Italian",
            Language::Russian => "Russian",
            Language::Portuguese => "Portuguese",
        }
    }
}

pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> impl Future<Output = Result<String, TranslationError>> + Send;
}

/// Waits `delay`, then translates. Any failure yields `text` unchanged.
///
/// Results that could not be stored as a single table field also fall back.
pub async fn translate_or_fallback<P: TranslationProvider>(
    provider: &P,
    text: &str,
    target: Language,
    delay: Duration,
) -> String {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match provider.translate(text, target).await {
        Ok(translated) => {
            let translated = translated.trim();
            if translated.is_empty() {
                debug!("{} returned nothing for {:?}", provider.name(), target);
                text.to_string()
            } else if !is_storable_field(translated) {
                warn!(
                    "{} translation of '{}' into {} contains a delimiter; keeping English",
                    provider.name(),
                    text,
                    target.label()
                );
                text.to_string()
            } else {
                translated.to_string()
            }
        }
        Err(err) => {
            debug!(
                "{} failed for '{}' into {}: {}",
                provider.name(),
                text,
                target.label(),
                err
            );
            text.to_string()
        }
    }
}

/// Translates into every language of [`Language::ALL`], one call at a time.
pub async fn translate_all<P: TranslationProvider>(
    provider: &P,
    text: &str,
    delay: Duration,
) -> Vec<String> {
    let mut columns = Vec::with_capacity(Language::ALL.len());
    for language in Language::ALL {
        columns.push(translate_or_fallback(provider, text, language, delay).await);
    }
    columns
}
