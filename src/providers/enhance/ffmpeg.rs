use std::path::Path;

use async_trait::async_trait;

use super::Enhancer;
use crate::error::Result;
use crate::media;

/// Denoises via the media tool: a 200 Hz highpass plus an FFT-based denoiser,
/// re-encoded to 16-bit PCM WAV (§4.2 item 4).
pub struct FfmpegEnhancer;

#[async_trait]
impl Enhancer for FfmpegEnhancer {
    async fn enhance(&self, in_path: &Path, out_path: &Path) -> Result<()> {
        media::denoise(in_path, out_path).await
    }
}
