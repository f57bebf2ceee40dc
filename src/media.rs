//! The media tool (C2 item 5): a thin async wrapper over `ffmpeg`/`ffprobe`
//! child processes, spawned non-blockingly (`tokio::process::Command`) so a
//! transcode never stalls the rest of the worker.

use std::path::Path;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::MergeMode;
use crate::error::{DubError, Result};

#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub duration_sec: f64,
    pub streams: Vec<StreamInfo>,
}

impl ProbeResult {
    pub fn has_video_stream(&self) -> bool {
        self.streams.iter().any(|s| s.kind == "video")
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe (§4.2 item 2): `{durationSec, streams:[{kind}]}`.
pub async fn probe(input: &Path) -> Result<ProbeResult> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "stream=codec_type"])
        .args(["-show_entries", "format=duration"])
        .args(["-of", "json"])
        .arg(input)
        .output()
        .await
        .map_err(|e| DubError::ProbeFailure(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(DubError::ProbeFailure(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| DubError::ProbeFailure(format!("failed to parse ffprobe output: {e}")))?;

    let duration_sec = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let streams = parsed
        .streams
        .into_iter()
        .map(|s| StreamInfo { kind: s.codec_type })
        .collect();

    Ok(ProbeResult {
        duration_sec,
        streams,
    })
}

/// Extract audio (§4.2 item 1): video → 16-bit PCM WAV, reporting progress
/// as a fraction of the source duration via `out_time_us=` lines on stdout.
pub async fn extract_audio<F: FnMut(f64)>(
    input: &Path,
    output: &Path,
    duration_sec: f64,
    mut on_progress: F,
) -> Result<()> {
    if !input.exists() {
        return Err(DubError::SourceMissing(input.display().to_string()));
    }

    let mut child = Command::new("ffmpeg")
        .args(["-y", "-progress", "pipe:1", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(output)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| DubError::ExtractFailure(format!("failed to spawn ffmpeg: {e}")))?;

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(us) = line.strip_prefix("out_time_us=").and_then(|v| v.parse::<i64>().ok())
            {
                if us > 0 && duration_sec > 0.0 {
                    let secs = us as f64 / 1_000_000.0;
                    on_progress((secs / duration_sec).min(1.0));
                }
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| DubError::ExtractFailure(format!("failed to wait for ffmpeg: {e}")))?;

    if !status.success() {
        return Err(DubError::ExtractFailure("ffmpeg audio extraction failed".to_string()));
    }

    on_progress(1.0);
    info!(output = %output.display(), "audio extracted");
    Ok(())
}

/// Convert for ASR (§4.2 item 3, optional): resample to mono 16 kHz 16-bit PCM WAV.
pub async fn convert_for_asr(input: &Path, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-ac", "1", "-ar", "16000", "-sample_fmt", "s16"])
        .arg(output)
        .status()
        .await
        .map_err(|e| DubError::ExtractFailure(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(DubError::ExtractFailure("ffmpeg conversion failed".to_string()));
    }
    Ok(())
}

/// Denoise (§4.2 item 4): 200 Hz highpass + FFT-based denoiser, re-encoded WAV.
pub async fn denoise(input: &Path, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-af", "highpass=f=200,afftdn"])
        .args(["-acodec", "pcm_s16le"])
        .arg(output)
        .status()
        .await
        .map_err(|e| DubError::EnhanceFailure(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(DubError::EnhanceFailure("ffmpeg denoise failed".to_string()));
    }
    debug!(output = %output.display(), "audio denoised");
    Ok(())
}

/// Escapes a path for use inside an ffmpeg filtergraph argument (colons and
/// backslashes are filtergraph metacharacters).
fn escape_for_filter(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
}

/// Merge dub (§4.2 item 5): combine the original video stream with a new
/// audio track, optionally burning subtitles (item 6). Returns the exact
/// filter chain used so callers/tests can assert on it (scenario S5).
pub struct MergeDubArgs<'a> {
    pub video_path: &'a Path,
    pub tts_path: &'a Path,
    pub out_path: &'a Path,
    pub mode: MergeMode,
    pub tts_duration_sec: f64,
    pub burn_srt_path: Option<&'a Path>,
}

pub fn mix_filter_chain(tts_duration_sec: f64) -> String {
    let fade = (0.3_f64).min(tts_duration_sec / 5.0).max(0.0);
    let fade_out_start = (tts_duration_sec - fade).max(0.0);
    format!(
        "[0:a]volume=0.7[orig];[1:a]afade=t=in:st=0:d={fade:.3},afade=t=out:st={fade_out_start:.3}:d={fade:.3}[tts];\
         [orig][tts]amix=inputs=2:duration=shortest:dropout_transition=0,dynaudnorm[aout]"
    )
}

pub async fn merge_dub(args: MergeDubArgs<'_>) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-i"])
        .arg(args.video_path)
        .args(["-i"])
        .arg(args.tts_path);

    // ffmpeg resolves `subtitles=` filter paths relative to its own working
    // directory, not the caller's, so the path burned in must be absolute.
    let video_filter = match args.burn_srt_path {
        Some(p) => {
            let abs = tokio::fs::canonicalize(p).await.map_err(|e| {
                DubError::MergeFailure(format!(
                    "failed to resolve subtitle path {}: {e}",
                    p.display()
                ))
            })?;
            Some(format!("subtitles={}", escape_for_filter(&abs)))
        }
        None => None,
    };

    match args.mode {
        MergeMode::Replace => {
            cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
            if let Some(vf) = &video_filter {
                cmd.args(["-vf", vf, "-c:v", "libx264"]);
            } else {
                cmd.args(["-c:v", "copy"]);
            }
            cmd.args(["-shortest"]);
        }
        MergeMode::Mix => {
            let chain = mix_filter_chain(args.tts_duration_sec);
            let filter_complex = match &video_filter {
                Some(vf) => format!("{chain};[0:v]{vf}[vout]"),
                None => chain,
            };
            cmd.args(["-filter_complex", &filter_complex]);
            if video_filter.is_some() {
                cmd.args(["-map", "[vout]", "-c:v", "libx264"]);
            } else {
                cmd.args(["-map", "0:v:0", "-c:v", "copy"]);
            }
            cmd.args(["-map", "[aout]", "-shortest"]);
        }
    }

    cmd.arg(args.out_path);

    let output = cmd
        .output()
        .await
        .map_err(|e| DubError::MergeFailure(format!("failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(DubError::MergeFailure(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    info!(out = %args.out_path.display(), "merge dub completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Scenario S5: the mix filter chain contains the documented operators.
    #[test]
    fn mix_filter_chain_matches_scenario_s5() {
        let chain = mix_filter_chain(6.0);
        assert!(chain.contains("volume=0.7"));
        assert!(chain.contains("afade=t=in:st=0:d=0.300"));
        assert!(chain.contains("afade=t=out:st=5.700:d=0.300"));
        assert!(chain.contains("amix=inputs=2:duration=shortest:dropout_transition=0"));
        assert!(chain.contains("dynaudnorm"));
    }

    #[test]
    fn mix_filter_chain_handles_short_tts_with_smaller_fade() {
        let chain = mix_filter_chain(1.0);
        // min(0.3, 1.0/5.0) = 0.2
        assert!(chain.contains("d=0.200"));
    }

    #[test]
    fn mix_filter_chain_handles_zero_duration_probe_failure_fallback() {
        let chain = mix_filter_chain(0.0);
        assert!(chain.contains("d=0.000"));
    }

    #[test]
    fn probe_result_detects_video_stream() {
        let probe = ProbeResult {
            duration_sec: 5.0,
            streams: vec![StreamInfo { kind: "video".to_string() }, StreamInfo { kind: "audio".to_string() }],
        };
        assert!(probe.has_video_stream());

        let audio_only = ProbeResult {
            duration_sec: 5.0,
            streams: vec![StreamInfo { kind: "audio".to_string() }],
        };
        assert!(!audio_only.has_video_stream());
    }

    #[test]
    fn escape_for_filter_escapes_colons() {
        let escaped = escape_for_filter(&PathBuf::from("C:/subs/out.srt"));
        assert!(escaped.contains("\\:"));
    }
}
