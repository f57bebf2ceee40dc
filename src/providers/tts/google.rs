use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tokio::fs;
use tracing::debug;

use super::{SynthesizeOptions, Synthesizer};
use crate::error::{DubError, Result};

const TTS_API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleSynthesizer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

#[async_trait]
impl Synthesizer for GoogleSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        out_path: &Path,
        opts: &SynthesizeOptions,
    ) -> Result<()> {
        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": opts.language_code,
                "name": opts.voice,
            },
            "audioConfig": { "audioEncoding": opts.encoding.to_uppercase() },
        });

        let url = format!("{TTS_API_URL}?key={}", self.api_key);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        debug!(%status, "Google TTS response received");

        if !status.is_success() {
            return Err(DubError::TtsFailure(format!(
                "Google TTS API error ({status}): {raw}"
            )));
        }

        let parsed: SynthesizeResponse = serde_json::from_str(&raw)?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content)
            .map_err(|e| DubError::TtsFailure(format!("invalid base64 audio: {e}")))?;

        if audio.is_empty() {
            return Err(DubError::TtsFailure("synthesized audio is empty".to_string()));
        }

        fs::write(out_path, audio).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
