use crate::config::SrtBounds;
use crate::transcript::{Segment, Transcript, Word};

use super::Cue;

fn sec_to_ms(sec: f64) -> i64 {
    (sec * 1000.0).floor() as i64
}

/// Algorithm A (§4.4): greedily groups flattened words into cues bounded by
/// max words / max line duration / max chars, applied in that order. A
/// single word that alone exceeds every bound still gets its own cue (the
/// "at least one word" guard).
fn word_grouped(words: &[&Word], bounds: &SrtBounds) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut i = 0;

    while i < words.len() {
        let start = words[i].start;
        let mut end = words[i].end;
        let mut chars = 0usize;
        let mut parts: Vec<&str> = Vec::new();
        let mut j = i;

        while j < words.len() {
            let w = words[j];
            let candidate_chars = chars + w.word.chars().count() + 1;
            let duration_exceeded = (w.end - start) > bounds.max_line_duration_sec;
            let chars_exceeded = candidate_chars > bounds.max_chars;
            let words_exceeded = parts.len() >= bounds.max_words;

            if !parts.is_empty() && (duration_exceeded || chars_exceeded || words_exceeded) {
                break;
            }

            parts.push(w.word.as_str());
            chars = candidate_chars;
            end = w.end;
            j += 1;
        }

        cues.push(Cue {
            index: cues.len() + 1,
            start_ms: sec_to_ms(start),
            end_ms: sec_to_ms(end),
            text: parts.join(" "),
        });
        i = j;
    }

    cues
}

/// One cue per canonical segment, using the segment's own start/end — used
/// when segments exist but no word-level timing does.
fn segments_as_cues(segments: &[Segment]) -> Vec<Cue> {
    segments
        .iter()
        .enumerate()
        .map(|(idx, s)| Cue {
            index: idx + 1,
            start_ms: sec_to_ms(s.start),
            end_ms: sec_to_ms(s.end),
            text: s.text.clone(),
        })
        .collect()
}

/// Splits on a sentence terminator immediately followed by whitespace. The
/// reference description calls for a zero-width look-behind split; `regex`
/// has no look-behind, so this scans byte-by-byte for the same cut points —
/// observably identical output, expressed as a manual scan instead.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut result = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (byte_idx, c) = chars[i];
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next_c)) = chars.get(i + 1) {
                if next_c.is_whitespace() {
                    let end_byte = byte_idx + c.len_utf8();
                    result.push(text[start..end_byte].to_string());
                    let mut k = i + 1;
                    while k < chars.len() && chars[k].1.is_whitespace() {
                        k += 1;
                    }
                    start = chars.get(k).map(|&(b, _)| b).unwrap_or(text.len());
                    i = k;
                    continue;
                }
            }
        }
        i += 1;
    }

    if start < text.len() {
        result.push(text[start..].to_string());
    }

    result
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Algorithm B (§4.4): lays sentences end-to-end, each given a duration
/// proportional to its character length.
fn proportional_fallback(text: &str, total_seconds: f64) -> Vec<Cue> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let total_chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    let mut cursor = 0.0;
    let mut cues = Vec::with_capacity(sentences.len());

    for (idx, sentence) in sentences.iter().enumerate() {
        let len = sentence.chars().count();
        let duration = if total_chars > 0 {
            total_seconds * (len as f64 / total_chars as f64)
        } else {
            0.0
        };
        let start = cursor;
        let end = cursor + duration;
        cues.push(Cue {
            index: idx + 1,
            start_ms: sec_to_ms(start),
            end_ms: sec_to_ms(end),
            text: sentence.clone(),
        });
        cursor = end;
    }

    cues
}

/// Picks the builder per §4.5: word-grouped when word timing exists, one cue
/// per segment when only segment timing exists, else the proportional
/// fallback over `text` using `total_seconds_fallback` (minimum 1).
pub fn build_cues(
    text: &str,
    transcript: Option<&Transcript>,
    total_seconds_fallback: f64,
    bounds: &SrtBounds,
) -> Vec<Cue> {
    if let Some(t) = transcript {
        if t.has_word_timing() {
            let words = t.all_words();
            if !words.is_empty() {
                return word_grouped(&words, bounds);
            }
        }
        if !t.segments.is_empty() {
            return segments_as_cues(&t.segments);
        }
    }

    proportional_fallback(text, total_seconds_fallback.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str, start: f64, end: f64) -> Word {
        Word {
            word: w.to_string(),
            start,
            end,
        }
    }

    /// Scenario S4: 20 words over 10s, default bounds, all cues respect the
    /// three simultaneous limits and cover every word in order.
    #[test]
    fn word_grouped_respects_bounds_and_covers_all_words_s4() {
        let mut words = Vec::new();
        for i in 0..20 {
            let start = i as f64 * 0.5;
            words.push(word(&format!("word{i}"), start, start + 0.4));
        }
        let refs: Vec<&Word> = words.iter().collect();
        let bounds = SrtBounds::default();
        let cues = word_grouped(&refs, &bounds);

        let mut covered = 0;
        let mut last_start = -1i64;
        for cue in &cues {
            assert!(cue.text.split(' ').count() <= bounds.max_words);
            assert!((cue.end_ms - cue.start_ms) as f64 <= bounds.max_line_duration_sec * 1000.0 + 1.0);
            assert!(cue.text.chars().count() <= bounds.max_chars);
            assert!(cue.start_ms >= last_start);
            last_start = cue.start_ms;
            covered += cue.text.split(' ').count();
        }
        assert_eq!(covered, 20);
    }

    #[test]
    fn single_word_exceeding_bounds_still_forms_its_own_cue() {
        let huge = "x".repeat(200);
        let words = vec![word(&huge, 0.0, 10.0)];
        let refs: Vec<&Word> = words.iter().collect();
        let cues = word_grouped(&refs, &SrtBounds::default());
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, huge);
    }

    #[test]
    fn cues_are_non_overlapping_and_ordered() {
        let words = vec![
            word("a", 0.0, 1.0),
            word("b", 1.0, 2.0),
            word("c", 5.0, 6.0),
        ];
        let refs: Vec<&Word> = words.iter().collect();
        let bounds = SrtBounds { max_words: 1, ..SrtBounds::default() };
        let cues = word_grouped(&refs, &bounds);
        assert_eq!(cues.len(), 3);
        for pair in cues.windows(2) {
            assert!(pair[0].end_ms <= pair[1].start_ms);
        }
    }

    #[test]
    fn proportional_split_respects_sentence_terminators() {
        let text = "Hello world. How are you? Fine!";
        let cues = proportional_fallback(text, 10.0);
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].text, "Hello world.");
        assert_eq!(cues[1].text, "How are you?");
        assert_eq!(cues[2].text, "Fine!");
    }

    /// Proportional law (§8 invariant 7): durations sum to totalSeconds and
    /// are proportional to sentence length.
    #[test]
    fn proportional_law_holds() {
        let text = "Hi. This is a much longer sentence than the first one.";
        let cues = proportional_fallback(text, 20.0);
        let total_ms: i64 = cues.iter().map(|c| c.end_ms - c.start_ms).sum();
        assert!((total_ms - 20_000).abs() <= 5);

        let len0 = cues[0].text.chars().count() as f64;
        let len1 = cues[1].text.chars().count() as f64;
        let d0 = (cues[0].end_ms - cues[0].start_ms) as f64;
        let d1 = (cues[1].end_ms - cues[1].start_ms) as f64;
        assert!(((d0 / d1) - (len0 / len1)).abs() < 0.01);
    }

    #[test]
    fn proportional_split_handles_no_terminators_as_single_cue() {
        let cues = proportional_fallback("just one clause with no stop", 4.0);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start_ms, 0);
        assert_eq!(cues[0].end_ms, 4000);
    }

    #[test]
    fn build_cues_prefers_word_timing_over_segments() {
        let transcript = Transcript {
            text: "hi there".to_string(),
            segments: vec![Segment {
                text: "hi there".to_string(),
                start: 0.0,
                end: 1.0,
                words: Some(vec![word("hi", 0.0, 0.5), word("there", 0.5, 1.0)]),
            }],
        };
        let cues = build_cues("hi there", Some(&transcript), 1.0, &SrtBounds::default());
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "hi there");
    }

    #[test]
    fn build_cues_falls_back_to_proportional_without_any_timing() {
        let cues = build_cues("Hello. World.", None, 2.0, &SrtBounds::default());
        assert_eq!(cues.len(), 2);
    }
}
