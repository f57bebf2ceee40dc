use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use super::Enhancer;
use crate::error::Result;

/// Copies the input through unchanged so the enhance stage can be exercised
/// offline (scenario S1) without shelling out to real `ffmpeg`.
pub struct MockEnhancer;

#[async_trait]
impl Enhancer for MockEnhancer {
    async fn enhance(&self, in_path: &Path, out_path: &Path) -> Result<()> {
        fs::copy(in_path, out_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn mock_enhance_copies_input_to_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        fs::write(&input, b"pcm-bytes").await.unwrap();

        MockEnhancer.enhance(&input, &output).await.unwrap();

        assert_eq!(fs::read(&output).await.unwrap(), b"pcm-bytes");
    }
}
