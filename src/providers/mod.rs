//! Provider adapters (C2, §4.2): ASR, translate, TTS, enhance and the media tool.
//!
//! Each capability is a trait implemented once per backend and selected by a
//! factory function reading configuration at worker startup — the pipeline
//! engine depends only on the trait objects, never on a concrete provider.

pub mod enhance;
pub mod transcribe;
pub mod translate;
pub mod tts;

use std::sync::Arc;

use crate::config::{AsrProvider, Config, EnhanceProvider, TranslateProvider, TtsProvider};
use crate::error::Result;

pub use enhance::Enhancer;
pub use transcribe::Transcriber;
pub use translate::Translator;
pub use tts::{Synthesizer, SynthesizeOptions};

pub fn create_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    match config.asr_provider {
        AsrProvider::Mock => Ok(Arc::new(transcribe::mock::MockTranscriber)),
        AsrProvider::Openai => {
            let key = config.asr_api_key.clone().ok_or_else(|| {
                crate::error::DubError::Config(
                    "ASR_API_KEY not set for ASR_PROVIDER=openai".to_string(),
                )
            })?;
            Ok(Arc::new(transcribe::openai::OpenAiTranscriber::new(key)))
        }
        AsrProvider::Google => {
            let key = config.asr_api_key.clone().ok_or_else(|| {
                crate::error::DubError::Config(
                    "ASR_API_KEY not set for ASR_PROVIDER=google".to_string(),
                )
            })?;
            Ok(Arc::new(transcribe::google::GoogleTranscriber::new(key)))
        }
    }
}

pub fn create_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    match config.translate_provider {
        TranslateProvider::Mock => Ok(Arc::new(translate::mock::MockTranslator)),
        TranslateProvider::Google => {
            let key = config.translate_api_key.clone().ok_or_else(|| {
                crate::error::DubError::Config(
                    "TRANSLATE_API_KEY not set for TRANSLATE_PROVIDER=google".to_string(),
                )
            })?;
            Ok(Arc::new(translate::google::GoogleTranslator::new(key)))
        }
    }
}

pub fn create_synthesizer(config: &Config) -> Result<Arc<dyn Synthesizer>> {
    match config.tts_provider {
        TtsProvider::Mock => Ok(Arc::new(tts::mock::MockSynthesizer)),
        TtsProvider::Google => {
            let key = config.tts_api_key.clone().ok_or_else(|| {
                crate::error::DubError::Config(
                    "TTS_API_KEY not set for TTS_PROVIDER=google".to_string(),
                )
            })?;
            Ok(Arc::new(tts::google::GoogleSynthesizer::new(key)))
        }
    }
}

/// Enhance always has a usable default (mock passthrough) since §6 only gates
/// *whether* enhance runs, not which provider backs it — mirrors ASR/translate/TTS
/// so scenario S1 stays fully offline.
pub fn create_enhancer(config: &Config) -> Arc<dyn Enhancer> {
    match config.enhance_provider {
        EnhanceProvider::Mock => Arc::new(enhance::mock::MockEnhancer),
        EnhanceProvider::Ffmpeg => Arc::new(enhance::ffmpeg::FfmpegEnhancer),
    }
}
