use async_trait::async_trait;

use super::Translator;
use crate::error::Result;

/// Deterministic offline translation stand-in (§4.2), required for scenario S1.
pub struct MockTranslator;

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        Ok(format!("[{target_lang}] {text}"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_translation_tags_target_language() {
        let out = MockTranslator.translate("hello", "id").await.unwrap();
        assert_eq!(out, "[id] hello");
    }
}
