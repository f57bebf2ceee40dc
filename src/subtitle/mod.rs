//! Subtitle builder (C4, §4.4): word-grouped SRT from a canonical transcript,
//! or a proportional fallback from plain text when no timing exists.

pub mod build;

pub use build::build_cues;

/// One SRT cue: index, timing, text. Times are integer milliseconds
/// internally (§9) to avoid floating-point drift accumulating across cues.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub index: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

/// `HH:MM:SS,mmm`, zero-padded, seconds floor-truncated (§4.4).
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let total_secs = ms / 1000;
    let millis = ms % 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Renders cues as an SRT document: blank-line-separated
/// `index\nHH:MM:SS,mmm --> HH:MM:SS,mmm\ntext\n` blocks, UTF-8, LF endings (§6).
pub fn render_srt(cues: &[Cue]) -> String {
    cues.iter()
        .map(|c| {
            format!(
                "{}\n{} --> {}\n{}\n",
                c.index,
                format_timestamp(c.start_ms),
                format_timestamp(c.end_ms),
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1500), "00:00:01,500");
        assert_eq!(format_timestamp(3_661_123), "01:01:01,123");
    }

    #[test]
    fn test_render_srt_blank_line_separated() {
        let cues = vec![
            Cue { index: 1, start_ms: 1500, end_ms: 4000, text: "Hello, world!".to_string() },
            Cue { index: 2, start_ms: 4500, end_ms: 7000, text: "This is a test.".to_string() },
        ];
        let out = render_srt(&cues);
        assert!(out.contains("1\n00:00:01,500 --> 00:00:04,000\nHello, world!"));
        assert!(out.contains("2\n00:00:04,500 --> 00:00:07,000\nThis is a test."));
    }
}
