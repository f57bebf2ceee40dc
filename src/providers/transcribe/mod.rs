pub mod google;
pub mod mock;
pub mod openai;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// ASR default timeout per call (§4.2): 5 minutes.
pub const ASR_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A speech-recognition backend. Returns the *raw* provider payload — a bare
/// string or an arbitrary JSON structure — which the normalizer (C3) maps to
/// the canonical transcript. The adapter itself never shapes the schema.
///
/// `want_word_timestamps` mirrors `ASR_TIMESTAMPS` (§6): when false, adapters
/// should not request word-level timing from the provider.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language_hint: Option<&str>,
        want_word_timestamps: bool,
    ) -> Result<Value>;

    fn name(&self) -> &'static str;
}
