use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::{Language, TranslationError, TranslationProvider};

pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Client for the public `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    source_lang: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: &str, source_lang: &str, timeout: Duration) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            source_lang: source_lang.to_string(),
        })
    }

    async fn request(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        let url = format!("{}/translate_a/single", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

impl TranslationProvider for GoogleTranslator {
    fn name(&self) -> &'static str {
        "Google"
    }

    fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> impl Future<Output = Result<String, TranslationError>> + Send {
        self.request(text, target)
    }
}

/// Joins the translated segments of `[[["seg", "src", ...], ...], ...]`.
fn parse_response(body: &str) -> Result<String, TranslationError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| TranslationError::Malformed(err.to_string()))?;

    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Malformed("missing sentence array".into()))?;

    let mut translated = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(Value::as_str) {
            translated.push_str(part);
        }
    }

    if translated.is_empty() {
        return Err(TranslationError::Malformed("empty translation".into()));
    }
    Ok(translated)
}
