use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

use super::Transcriber;
use crate::error::{DubError, Result};

const SPEECH_API_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// Google Cloud Speech-to-Text adapter. Returns the provider's native
/// `{results:[{alternatives:[{transcript, words?}]}]}` shape (normalizer Shape C).
pub struct GoogleTranscriber {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl Transcriber for GoogleTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language_hint: Option<&str>,
        want_word_timestamps: bool,
    ) -> Result<Value> {
        let bytes = fs::read(audio_path).await?;
        let content = base64::engine::general_purpose::STANDARD.encode(bytes);

        let body = json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": 16000,
                "languageCode": language_hint.unwrap_or("en-US"),
                "enableWordTimeOffsets": want_word_timestamps,
            },
            "audio": { "content": content },
        });

        let url = format!("{SPEECH_API_URL}?key={}", self.api_key);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, "Google Speech response received");

        if !status.is_success() {
            return Err(DubError::AsrFailure(format!(
                "Google Speech API error ({status}): {text}"
            )));
        }

        let payload: Value = serde_json::from_str(&text)?;
        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
