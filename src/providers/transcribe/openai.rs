use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use super::Transcriber;
use crate::error::{DubError, Result};

const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// OpenAI Whisper transcription adapter. Retries live in the caller (C1);
/// this client makes one attempt per call.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    async fn build_form(
        &self,
        audio_path: &Path,
        language_hint: Option<&str>,
        want_word_timestamps: bool,
    ) -> Result<Form> {
        let bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            _ => "application/octet-stream",
        };

        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime_type)?;
        let mut form = Form::new()
            .part("file", part)
            .text("model", "whisper-1")
            .text("response_format", "verbose_json");

        if want_word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }

        if let Some(lang) = language_hint {
            form = form.text("language", lang.to_string());
        }

        Ok(form)
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language_hint: Option<&str>,
        want_word_timestamps: bool,
    ) -> Result<Value> {
        let form = self
            .build_form(audio_path, language_hint, want_word_timestamps)
            .await?;

        let response = self
            .client
            .post(WHISPER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "OpenAI Whisper response received");

        if !status.is_success() {
            return Err(DubError::AsrFailure(format!(
                "OpenAI Whisper API error ({status}): {body}"
            )));
        }

        // verbose_json is already shaped as Shape A ({text, segments[{text,start,end,words?}]})
        let payload: Value = serde_json::from_str(&body)?;
        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
