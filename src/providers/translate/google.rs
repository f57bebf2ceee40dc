use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Translator;
use crate::error::{DubError, Result};

const TRANSLATE_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";

pub struct GoogleTranslator {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleTranslator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let body = json!({
            "q": text,
            "target": target_lang,
            "format": "text",
        });

        let url = format!("{TRANSLATE_API_URL}?key={}", self.api_key);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        debug!(%status, "Google Translate response received");

        if !status.is_success() {
            return Err(DubError::TranslateFailure(format!(
                "Google Translate API error ({status}): {raw}"
            )));
        }

        let parsed: TranslateResponse = serde_json::from_str(&raw)?;
        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| DubError::TranslateFailure("empty translation response".to_string()))
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
