use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Transcriber;
use crate::error::Result;

/// Deterministic offline ASR stand-in (§4.2): required so the full pipeline
/// can be exercised without network access (see scenario S1).
pub struct MockTranscriber;

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        _language_hint: Option<&str>,
        want_word_timestamps: bool,
    ) -> Result<Value> {
        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let text = format!("This is a mock transcription of {stem}.");
        let mut segment = json!({
            "text": text,
            "start": 0.0,
            "end": 2.0,
        });
        if want_word_timestamps {
            segment["words"] = json!([
                {"word": "This", "start": 0.0, "end": 0.3},
                {"word": "is", "start": 0.3, "end": 0.5},
            ]);
        }
        Ok(json!({
            "text": text,
            "segments": [segment]
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transcription_is_deterministic() {
        let path = Path::new("clip.wav");
        let a = MockTranscriber.transcribe(path, None, false).await.unwrap();
        let b = MockTranscriber.transcribe(path, None, false).await.unwrap();
        assert_eq!(a, b);
        assert!(a["text"].as_str().unwrap().contains("clip"));
    }

    #[tokio::test]
    async fn mock_transcription_includes_words_only_when_requested() {
        let path = Path::new("clip.wav");
        let without = MockTranscriber.transcribe(path, None, false).await.unwrap();
        assert!(without["segments"][0].get("words").is_none());

        let with = MockTranscriber.transcribe(path, None, true).await.unwrap();
        assert!(with["segments"][0]["words"].is_array());
    }
}
