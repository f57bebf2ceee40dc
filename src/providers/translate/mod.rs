pub mod google;
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Translate default timeout per call (§4.2): 5 minutes.
pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A translation backend: UTF-8 text + a BCP-47-ish target code in, translated
/// UTF-8 text out.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}
