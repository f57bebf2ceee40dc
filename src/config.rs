use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsrProvider {
    #[default]
    Mock,
    Openai,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslateProvider {
    Mock,
    Google,
}

impl Default for TranslateProvider {
    fn default() -> Self {
        TranslateProvider::Google
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    Mock,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhanceProvider {
    #[default]
    Mock,
    Ffmpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    #[default]
    Replace,
    Mix,
}

impl std::str::FromStr for MergeMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mix" => Ok(MergeMode::Mix),
            _ => Ok(MergeMode::Replace),
        }
    }
}

/// Subtitle-builder bounds for algorithm A (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct SrtBounds {
    pub max_words: usize,
    pub max_line_duration_sec: f64,
    pub max_chars: usize,
}

impl Default for SrtBounds {
    fn default() -> Self {
        Self {
            max_words: 7,
            max_line_duration_sec: 4.0,
            max_chars: 80,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub asr_provider: AsrProvider,
    pub asr_language: Option<String>,
    pub asr_timestamps: bool,
    pub asr_api_key: Option<String>,

    pub translate_provider: TranslateProvider,
    pub translate_target: String,
    pub translate_api_key: Option<String>,

    pub tts_provider: TtsProvider,
    pub tts_language: String,
    pub tts_voice: Option<String>,
    pub tts_api_key: Option<String>,

    pub merge_mode: MergeMode,
    pub burn_subtitles: bool,
    pub enhance: bool,
    pub enhance_provider: EnhanceProvider,

    pub srt_bounds: SrtBounds,

    pub upload_dir: PathBuf,
    pub database_url: String,
    pub worker_concurrency: usize,
    pub job_lease_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asr_provider: AsrProvider::default(),
            asr_language: None,
            asr_timestamps: false,
            asr_api_key: None,

            translate_provider: TranslateProvider::default(),
            translate_target: "id".to_string(),
            translate_api_key: None,

            tts_provider: TtsProvider::default(),
            tts_language: "id-ID".to_string(),
            tts_voice: None,
            tts_api_key: None,

            merge_mode: MergeMode::default(),
            burn_subtitles: false,
            enhance: false,
            enhance_provider: EnhanceProvider::default(),

            srt_bounds: SrtBounds::default(),

            upload_dir: PathBuf::from("uploads"),
            database_url: "sqlite://uploads/jobs.db".to_string(),
            worker_concurrency: 1,
            job_lease_secs: 300,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from the process environment (§6), falling back to
    /// documented defaults for everything that is unset.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("ASR_PROVIDER") {
            config.asr_provider = match v.to_lowercase().as_str() {
                "openai" => AsrProvider::Openai,
                "google" => AsrProvider::Google,
                _ => AsrProvider::Mock,
            };
        }
        config.asr_language = std::env::var("ASR_LANGUAGE").ok();
        config.asr_timestamps = env_bool("ASR_TIMESTAMPS", config.asr_timestamps);
        config.asr_api_key = std::env::var("ASR_API_KEY").ok();

        if let Ok(v) = std::env::var("TRANSLATE_PROVIDER") {
            config.translate_provider = match v.to_lowercase().as_str() {
                "mock" => TranslateProvider::Mock,
                _ => TranslateProvider::Google,
            };
        }
        config.translate_target = env_parsed("TRANSLATE_TARGET", config.translate_target);
        config.translate_api_key = std::env::var("TRANSLATE_API_KEY").ok();

        if let Ok(v) = std::env::var("TTS_PROVIDER") {
            config.tts_provider = match v.to_lowercase().as_str() {
                "google" => TtsProvider::Google,
                _ => TtsProvider::Mock,
            };
        }
        config.tts_language = env_parsed("TTS_LANGUAGE", config.tts_language);
        config.tts_voice = std::env::var("TTS_VOICE").ok();
        config.tts_api_key = std::env::var("TTS_API_KEY").ok();

        if let Ok(v) = std::env::var("MERGE_MODE") {
            config.merge_mode = v.parse().unwrap_or_default();
        }
        config.burn_subtitles = env_bool("BURN_SUBTITLES", config.burn_subtitles);
        config.enhance = env_bool("ENHANCE", config.enhance);
        if let Ok(v) = std::env::var("ENHANCE_PROVIDER") {
            config.enhance_provider = match v.to_lowercase().as_str() {
                "ffmpeg" => EnhanceProvider::Ffmpeg,
                _ => EnhanceProvider::Mock,
            };
        }

        config.srt_bounds.max_words = env_parsed("SRT_MAX_WORDS", config.srt_bounds.max_words);
        config.srt_bounds.max_line_duration_sec =
            env_parsed("SRT_MAX_LINE_DURATION", config.srt_bounds.max_line_duration_sec);
        config.srt_bounds.max_chars = env_parsed("SRT_MAX_CHARS", config.srt_bounds.max_chars);

        if let Ok(v) = std::env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(v);
        }
        config.database_url = env_parsed("DATABASE_URL", config.database_url);
        config.worker_concurrency = env_parsed("WORKER_CONCURRENCY", config.worker_concurrency);
        config.job_lease_secs = env_parsed("JOB_LEASE_SECS", config.job_lease_secs);

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_concurrency == 0 {
            return Err(DubError::Config(
                "WORKER_CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if matches!(self.asr_provider, AsrProvider::Openai | AsrProvider::Google)
            && self.asr_api_key.is_none()
        {
            return Err(DubError::Config(
                "ASR_API_KEY not set for the configured ASR_PROVIDER".to_string(),
            ));
        }
        if matches!(self.translate_provider, TranslateProvider::Google)
            && self.translate_api_key.is_none()
        {
            return Err(DubError::Config(
                "TRANSLATE_API_KEY not set for the configured TRANSLATE_PROVIDER".to_string(),
            ));
        }
        if matches!(self.tts_provider, TtsProvider::Google) && self.tts_api_key.is_none() {
            return Err(DubError::Config(
                "TTS_API_KEY not set for the configured TTS_PROVIDER".to_string(),
            ));
        }
        Ok(())
    }

    /// Language code for TTS derived from a target language (§4.5): a small
    /// fixed mapping, falling through to the configured default for unknown targets.
    pub fn tts_language_for(&self, target_lang: &str) -> String {
        match target_lang {
            "id" => "id-ID".to_string(),
            "en" => "en-US".to_string(),
            "es" => "es-ES".to_string(),
            "fr" => "fr-FR".to_string(),
            "de" => "de-DE".to_string(),
            "ja" => "ja-JP".to_string(),
            "ko" => "ko-KR".to_string(),
            "zh" => "zh-CN".to_string(),
            "pt" => "pt-BR".to_string(),
            "ar" => "ar-SA".to_string(),
            _ => self.tts_language.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.merge_mode, MergeMode::Replace);
        assert_eq!(config.worker_concurrency, 1);
    }

    #[test]
    fn test_merge_mode_parsing_defaults_unknown_to_replace() {
        assert_eq!("mix".parse::<MergeMode>().unwrap(), MergeMode::Mix);
        assert_eq!("weird".parse::<MergeMode>().unwrap(), MergeMode::Replace);
    }

    #[test]
    fn test_tts_language_mapping_falls_through_for_unknown() {
        let config = Config::default();
        assert_eq!(config.tts_language_for("en"), "en-US");
        assert_eq!(config.tts_language_for("xx"), config.tts_language);
    }
}
