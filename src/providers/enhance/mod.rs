pub mod ffmpeg;
pub mod mock;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Denoises an audio file, writing a 16-bit PCM WAV at `out_path` (§4.2).
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, in_path: &Path, out_path: &Path) -> Result<()>;
}
