//! Pipeline engine (C5, §4.5): drives the 5-stage state machine for one job
//! execution, reports progress, and applies the per-stage fallback policy —
//! tolerated failures leave a marker file next to the stem and let later
//! stages still run; only a fatal stage fails the whole job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Config, MergeMode};
use crate::error::{DubError, Result};
use crate::media::{self, MergeDubArgs};
use crate::providers::transcribe::ASR_TIMEOUT;
use crate::providers::translate::TRANSLATE_TIMEOUT;
use crate::providers::tts::TTS_TIMEOUT;
use crate::providers::{
    self, Enhancer, Synthesizer, SynthesizeOptions, Transcriber, Translator,
};
use crate::retry::{retry, RetryPolicy};
use crate::subtitle::{build_cues, render_srt};
use crate::transcript::{self, Transcript};

/// Submission payload (§3 job record `data`).
#[derive(Debug, Clone)]
pub struct JobInput {
    pub source_path: PathBuf,
    pub original_filename: String,
    pub merge_mode: Option<MergeMode>,
    pub burn_subtitles: Option<bool>,
    pub enhance: Option<bool>,
}

/// Artifact kind → filesystem path, populated only for artifacts that exist
/// on disk after the run (§3, §4.5 finalization).
#[derive(Debug, Clone, Default)]
pub struct JobResult {
    pub audio: Option<PathBuf>,
    pub enhanced_audio: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
    pub translated: Option<PathBuf>,
    pub tts: Option<PathBuf>,
    pub dubbed: Option<PathBuf>,
}

/// Progress reports are advisory (§9): implementations must swallow their own
/// errors rather than let a failed progress write fail the pipeline.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: u8);
}

pub struct NullProgressSink;

#[async_trait]
impl ProgressSink for NullProgressSink {
    async fn report(&self, _progress: u8) {}
}

/// Translation either succeeded, or failed and carries both the persisted
/// sentinel text and the transcript-text fallback used by TTS/subtitles
/// (§9 open question — kept as a typed value rather than re-parsing a string
/// prefix, while still persisting the exact `"TRANSLATION error"` sentinel
/// the distilled spec's scenario S3 pins).
enum TranslationOutcome {
    Ok(String),
    Failed { message: String, fallback: String },
}

impl TranslationOutcome {
    fn tts_input(&self) -> &str {
        match self {
            TranslationOutcome::Ok(s) => s,
            TranslationOutcome::Failed { fallback, .. } => fallback,
        }
    }

    fn persisted_text(&self) -> String {
        match self {
            TranslationOutcome::Ok(s) => s.clone(),
            TranslationOutcome::Failed { message, .. } => {
                format!("TRANSLATION error: {message}")
            }
        }
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("job")
        .to_string()
}

struct ArtifactPaths {
    audio: PathBuf,
    enhanced_audio: PathBuf,
    transcript_txt: PathBuf,
    transcript_json: PathBuf,
    translated_txt: PathBuf,
    tts: PathBuf,
    srt: PathBuf,
    dubbed: PathBuf,
    enhance_error: PathBuf,
    tts_error: PathBuf,
    merge_error: PathBuf,
    merge_skip: PathBuf,
}

impl ArtifactPaths {
    fn new(upload_dir: &Path, stem: &str) -> Self {
        let p = |suffix: &str| upload_dir.join(format!("{stem}{suffix}"));
        Self {
            audio: p("-audio.wav"),
            enhanced_audio: p("-audio-enhanced.wav"),
            transcript_txt: p("-transcript.txt"),
            transcript_json: p("-transcript.txt.json"),
            translated_txt: p("-translated.txt"),
            tts: p("-tts.mp3"),
            srt: p(".srt"),
            dubbed: p("-dubbed.mp4"),
            enhance_error: p("-enhance.error.txt"),
            tts_error: p("-tts.mp3.error.txt"),
            merge_error: p("-merge.error.txt"),
            merge_skip: p("-merge.skip.txt"),
        }
    }
}

async fn write_marker(path: &Path, content: &str) {
    if let Err(e) = tokio::fs::write(path, content).await {
        warn!(path = %path.display(), error = %e, "failed to write marker file");
    }
}

/// The retry budget every provider/media-tool call is wrapped in (§4.2: 2–3).
fn adapter_retry_policy() -> RetryPolicy {
    RetryPolicy::new(2, 500, 2.0)
}

pub struct PipelineEngine {
    config: Config,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    enhancer: Arc<dyn Enhancer>,
}

impl PipelineEngine {
    pub fn new(config: Config) -> Result<Self> {
        let transcriber = providers::create_transcriber(&config)?;
        let translator = providers::create_translator(&config)?;
        let synthesizer = providers::create_synthesizer(&config)?;
        let enhancer = providers::create_enhancer(&config);
        Ok(Self::with_providers(config, transcriber, translator, synthesizer, enhancer))
    }

    /// Builds an engine from already-constructed provider trait objects,
    /// bypassing the config-driven factories — used by tests that need a
    /// provider the factories don't expose (e.g. one that always fails).
    pub fn with_providers(
        config: Config,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn Synthesizer>,
        enhancer: Arc<dyn Enhancer>,
    ) -> Self {
        Self {
            config,
            transcriber,
            translator,
            synthesizer,
            enhancer,
        }
    }

    /// Runs START → EXTRACT → [ENHANCE?] → TRANSCRIBE → TRANSLATE →
    /// SYNTHESIZE → [MERGE?] → DONE for one job (§4.5).
    pub async fn run(&self, job: &JobInput, progress: &dyn ProgressSink) -> Result<JobResult> {
        if !job.source_path.exists() {
            return Err(DubError::SourceMissing(job.source_path.display().to_string()));
        }

        let stem = stem_of(&job.source_path);
        let paths = ArtifactPaths::new(&self.config.upload_dir, &stem);
        let mut result = JobResult::default();

        progress.report(0).await;

        // --- EXTRACT (fatal) ---
        let probe = media::probe(&job.source_path).await.ok();
        let source_duration = probe.as_ref().map(|p| p.duration_sec).unwrap_or(0.0);
        media::extract_audio(&job.source_path, &paths.audio, source_duration, |frac| {
            let _ = frac;
        })
        .await?;
        result.audio = Some(paths.audio.clone());
        info!(stem, "extract stage complete");

        // --- ENHANCE (tolerated) ---
        let enhance_enabled = job.enhance.unwrap_or(self.config.enhance);
        let mut working_audio = paths.audio.clone();
        if enhance_enabled {
            progress.report(15).await;
            match self.enhancer.enhance(&paths.audio, &paths.enhanced_audio).await {
                Ok(()) => {
                    working_audio = paths.enhanced_audio.clone();
                    result.enhanced_audio = Some(paths.enhanced_audio.clone());
                }
                Err(e) => {
                    warn!(stem, error = %e, "enhance stage failed, falling back to original audio");
                    write_marker(&paths.enhance_error, &e.to_string()).await;
                }
            }
        }
        progress.report(20).await;

        // --- TRANSCRIBE (tolerated) ---
        let language_hint = self.config.asr_language.clone();
        let want_word_timestamps = self.config.asr_timestamps;
        let transcriber = self.transcriber.clone();
        let working_audio_for_asr = working_audio.clone();
        let asr_result = retry(adapter_retry_policy(), move || {
            let transcriber = transcriber.clone();
            let audio = working_audio_for_asr.clone();
            let lang = language_hint.clone();
            async move {
                match tokio::time::timeout(
                    ASR_TIMEOUT,
                    transcriber.transcribe(&audio, lang.as_deref(), want_word_timestamps),
                )
                .await
                {
                    Ok(inner) => inner,
                    Err(_) => Err(DubError::AsrFailure(format!(
                        "ASR call timed out after {ASR_TIMEOUT:?}"
                    ))),
                }
            }
        })
        .await;

        let transcript = match asr_result {
            Ok(payload) => transcript::normalize(&payload),
            Err(e) => {
                warn!(stem, error = %e, "transcribe stage failed, using error placeholder text");
                Transcript {
                    text: format!("ASR error: {e}"),
                    segments: Vec::new(),
                }
            }
        };

        let transcript_body = format!(
            "TRANSCRIPT\nSource: {}\n\n{}",
            job.original_filename, transcript.text
        );
        tokio::fs::write(&paths.transcript_txt, &transcript_body).await?;
        let sidecar = serde_json::to_string_pretty(&transcript)?;
        tokio::fs::write(&paths.transcript_json, sidecar).await?;
        result.transcript = Some(paths.transcript_txt.clone());
        progress.report(25).await;

        // --- TRANSLATE (tolerated) ---
        let target_lang = self.config.translate_target.clone();
        let translator = self.translator.clone();
        let text_to_translate = transcript.text.clone();
        let translate_result = retry(adapter_retry_policy(), move || {
            let translator = translator.clone();
            let text = text_to_translate.clone();
            let target = target_lang.clone();
            async move {
                match tokio::time::timeout(TRANSLATE_TIMEOUT, translator.translate(&text, &target)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(DubError::TranslateFailure(format!(
                        "translate call timed out after {TRANSLATE_TIMEOUT:?}"
                    ))),
                }
            }
        })
        .await;

        let translation = match translate_result {
            Ok(text) => TranslationOutcome::Ok(text),
            Err(e) => {
                warn!(stem, error = %e, "translate stage failed, falling back to transcript text");
                TranslationOutcome::Failed {
                    message: e.to_string(),
                    fallback: transcript.text.clone(),
                }
            }
        };
        tokio::fs::write(&paths.translated_txt, translation.persisted_text()).await?;
        result.translated = Some(paths.translated_txt.clone());
        progress.report(45).await;

        // --- SYNTHESIZE (tolerated) ---
        progress.report(55).await;
        let tts_text = translation.tts_input().to_string();
        let tts_language = self.config.tts_language_for(&self.config.translate_target);
        let opts = SynthesizeOptions {
            voice: self.config.tts_voice.clone(),
            language_code: tts_language,
            encoding: "mp3".to_string(),
        };
        let synthesizer = self.synthesizer.clone();
        let tts_path_for_retry = paths.tts.clone();
        let synth_result = retry(adapter_retry_policy(), move || {
            let synthesizer = synthesizer.clone();
            let text = tts_text.clone();
            let out = tts_path_for_retry.clone();
            let opts = opts.clone();
            async move {
                match tokio::time::timeout(TTS_TIMEOUT, synthesizer.synthesize(&text, &out, &opts)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(DubError::TtsFailure(format!(
                        "synthesize call timed out after {TTS_TIMEOUT:?}"
                    ))),
                }
            }
        })
        .await;

        let tts_ok = match synth_result {
            Ok(()) => {
                result.tts = Some(paths.tts.clone());
                true
            }
            Err(e) => {
                warn!(stem, error = %e, "synthesize stage failed, merge will be skipped");
                write_marker(&paths.tts_error, &e.to_string()).await;
                false
            }
        };
        progress.report(85).await;

        // --- MERGE (optional, tolerated) ---
        if tts_ok {
            progress.report(90).await;
            self.merge_stage(job, &paths, &probe, &translation, &transcript, &mut result)
                .await;
            progress.report(95).await;
        }

        progress.report(100).await;
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn merge_stage(
        &self,
        job: &JobInput,
        paths: &ArtifactPaths,
        probe: &Option<media::ProbeResult>,
        translation: &TranslationOutcome,
        transcript: &Transcript,
        result: &mut JobResult,
    ) {
        let probe = match probe {
            Some(p) => p,
            None => {
                write_marker(&paths.merge_error, "failed to probe source media").await;
                return;
            }
        };

        if !probe.has_video_stream() {
            write_marker(&paths.merge_skip, "source has no video stream").await;
            return;
        }

        let burn_subtitles = job.burn_subtitles.unwrap_or(self.config.burn_subtitles);
        let srt_path = if burn_subtitles {
            let text = translation.tts_input();
            let cues = build_cues(text, Some(transcript), probe.duration_sec, &self.config.srt_bounds);
            let srt_body = render_srt(&cues);
            if tokio::fs::write(&paths.srt, srt_body).await.is_ok() {
                Some(paths.srt.clone())
            } else {
                None
            }
        } else {
            None
        };

        let tts_duration = media::probe(&paths.tts)
            .await
            .map(|p| p.duration_sec)
            .unwrap_or(0.0);

        let merge_mode = job.merge_mode.unwrap_or(self.config.merge_mode);
        let merge_args = MergeDubArgs {
            video_path: &job.source_path,
            tts_path: &paths.tts,
            out_path: &paths.dubbed,
            mode: merge_mode,
            tts_duration_sec: tts_duration,
            burn_srt_path: srt_path.as_deref(),
        };

        match media::merge_dub(merge_args).await {
            Ok(()) => {
                result.dubbed = Some(paths.dubbed.clone());
            }
            Err(e) => {
                warn!(stem = %stem_of(&job.source_path), error = %e, "merge stage failed");
                write_marker(&paths.merge_error, &e.to_string()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_outcome_persists_sentinel_and_falls_back_for_tts() {
        let outcome = TranslationOutcome::Failed {
            message: "boom".to_string(),
            fallback: "hello world".to_string(),
        };
        assert_eq!(outcome.persisted_text(), "TRANSLATION error: boom");
        assert_eq!(outcome.tts_input(), "hello world");

        let ok = TranslationOutcome::Ok("halo dunia".to_string());
        assert_eq!(ok.persisted_text(), "halo dunia");
        assert_eq!(ok.tts_input(), "halo dunia");
    }

    #[test]
    fn artifact_paths_derive_from_stem() {
        let paths = ArtifactPaths::new(Path::new("uploads"), "clip");
        assert_eq!(paths.audio, PathBuf::from("uploads/clip-audio.wav"));
        assert_eq!(paths.dubbed, PathBuf::from("uploads/clip-dubbed.mp4"));
        assert_eq!(paths.srt, PathBuf::from("uploads/clip.srt"));
        assert_eq!(paths.merge_skip, PathBuf::from("uploads/clip-merge.skip.txt"));
    }
}
