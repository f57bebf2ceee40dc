pub mod google;
pub mod mock;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// TTS default timeout per call (§4.2): 5 minutes.
pub const TTS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct SynthesizeOptions {
    pub voice: Option<String>,
    pub language_code: String,
    pub encoding: String,
}

/// A speech-synthesis backend: UTF-8 text + options in, an audio file written
/// at `out_path`. Empty audio is a failure (§4.2).
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        out_path: &Path,
        opts: &SynthesizeOptions,
    ) -> Result<()>;

    fn name(&self) -> &'static str;
}
