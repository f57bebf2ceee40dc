use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use super::{SynthesizeOptions, Synthesizer};
use crate::error::Result;

/// Writes a tiny, deterministic placeholder "audio" file so the merge stage
/// has something to mix/replace with in offline tests (scenario S1).
pub struct MockSynthesizer;

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        out_path: &Path,
        _opts: &SynthesizeOptions,
    ) -> Result<()> {
        fs::write(out_path, [0u8]).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn mock_synthesis_writes_nonempty_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.mp3");
        let opts = SynthesizeOptions {
            voice: None,
            language_code: "id-ID".to_string(),
            encoding: "mp3".to_string(),
        };
        MockSynthesizer.synthesize("hi", &out, &opts).await.unwrap();
        let bytes = fs::read(&out).await.unwrap();
        assert!(!bytes.is_empty());
    }
}
