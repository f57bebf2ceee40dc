//! Canonical transcript schema (§3) and the ASR response normalizer (C3, §4.3).
//!
//! Providers hand back wildly different JSON shapes. The normalizer's job is to
//! collapse all of them into one schema so nothing downstream ever has to know
//! which provider produced a transcript.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All words across all segments, in order, flattened for the subtitle builder.
    pub fn all_words(&self) -> Vec<&Word> {
        self.segments
            .iter()
            .filter_map(|s| s.words.as_ref())
            .flatten()
            .collect()
    }

    pub fn has_word_timing(&self) -> bool {
        self.segments.iter().any(|s| s.words.is_some())
    }
}

/// Coerces a JSON number field to a finite f64, defaulting non-finite or
/// missing values to 0 as required by §4.3.
fn coerce_number(v: Option<&Value>) -> f64 {
    match v.and_then(Value::as_f64) {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn coerce_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Either a bare number of seconds or a `{seconds, nanos}` object (Shape C).
fn coerce_seconds_or_duration(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
        Some(Value::Object(obj)) => {
            let seconds = obj.get("seconds").and_then(Value::as_f64).unwrap_or(0.0);
            let nanos = obj.get("nanos").and_then(Value::as_f64).unwrap_or(0.0);
            let total = seconds + nanos / 1e9;
            if total.is_finite() {
                total
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Maps a raw provider payload to the canonical transcript, dispatching
/// structurally in the order documented at §4.3.
pub fn normalize(payload: &Value) -> Transcript {
    match payload {
        Value::Null => Transcript::empty(),
        Value::String(s) => Transcript {
            text: s.clone(),
            segments: Vec::new(),
        },
        Value::Object(obj) if obj.contains_key("text") && obj.get("segments").is_some() => {
            normalize_shape_a(obj)
        }
        Value::Object(obj) if obj.contains_key("segments") => normalize_shape_b(obj),
        Value::Object(obj) if obj.contains_key("results") => normalize_shape_c(obj),
        other => Transcript {
            text: other.to_string(),
            segments: Vec::new(),
        },
    }
}

/// Shape A: `{text, segments}` — each segment already carries its own text/start/end.
fn normalize_shape_a(obj: &serde_json::Map<String, Value>) -> Transcript {
    let text = coerce_string(obj.get("text"));
    let segments = obj
        .get("segments")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(normalize_segment_a).collect())
        .unwrap_or_default();
    Transcript { text, segments }
}

fn normalize_segment_a(seg: &Value) -> Segment {
    let words = seg.get("words").and_then(Value::as_array).map(|arr| {
        arr.iter()
            .map(|w| Word {
                word: coerce_string(w.get("word")),
                start: coerce_number(w.get("start")),
                end: coerce_number(w.get("end")),
            })
            .collect()
    });
    Segment {
        text: coerce_string(seg.get("text")),
        start: coerce_number(seg.get("start")),
        end: coerce_number(seg.get("end")),
        words,
    }
}

/// Shape B: `{segments}` only, each segment's fields carrying provider-specific
/// fallback names (`transcript`/`begin`/`seek`/`duration`/...).
fn normalize_shape_b(obj: &serde_json::Map<String, Value>) -> Transcript {
    let segments: Vec<Segment> = obj
        .get("segments")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(normalize_segment_b).collect())
        .unwrap_or_default();

    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Transcript { text, segments }
}

fn first_present<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(k))
}

fn normalize_segment_b(seg: &Value) -> Segment {
    let text = first_present(seg, &["text", "transcript"])
        .map(coerce_str_or_empty)
        .unwrap_or_default();

    let start = first_present(seg, &["start", "begin", "seek"])
        .map(|v| coerce_number(Some(v)))
        .unwrap_or(0.0);

    let end = match seg.get("end") {
        Some(v) => coerce_number(Some(v)),
        None => {
            let duration = seg.get("duration").and_then(Value::as_f64).unwrap_or(0.0);
            start + duration
        }
    };

    let words = seg.get("words").and_then(Value::as_array).map(|arr| {
        arr.iter()
            .map(|w| Word {
                word: first_present(w, &["word", "text", "token"])
                    .map(coerce_str_or_empty)
                    .unwrap_or_default(),
                start: first_present(w, &["start", "startTime"])
                    .map(|v| coerce_number(Some(v)))
                    .unwrap_or(0.0),
                end: first_present(w, &["end", "endTime"])
                    .map(|v| coerce_number(Some(v)))
                    .unwrap_or(0.0),
            })
            .collect()
    });

    Segment {
        text,
        start,
        end,
        words,
    }
}

fn coerce_str_or_empty(v: &Value) -> String {
    v.as_str().unwrap_or("").to_string()
}

/// Shape C: Google-Speech-style `{results:[{alternatives:[{transcript, words?}]}]}`.
/// Word timings may be a bare seconds number or `{seconds, nanos}`. Each word
/// becomes its own segment so downstream code always sees timed segments.
fn normalize_shape_c(obj: &serde_json::Map<String, Value>) -> Transcript {
    let results = obj.get("results").and_then(Value::as_array);
    let Some(results) = results else {
        return Transcript::empty();
    };

    let mut texts = Vec::new();
    let mut segments = Vec::new();

    for result in results {
        let Some(alt) = result
            .get("alternatives")
            .and_then(Value::as_array)
            .and_then(|a| a.first())
        else {
            continue;
        };

        let transcript = alt
            .get("transcript")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if !transcript.is_empty() {
            texts.push(transcript.clone());
        }

        if let Some(words) = alt.get("words").and_then(Value::as_array) {
            for w in words {
                let word_text = w.get("word").and_then(Value::as_str).unwrap_or("").to_string();
                let start = coerce_seconds_or_duration(w.get("startTime"));
                let end = coerce_seconds_or_duration(w.get("endTime"));
                segments.push(Segment {
                    text: word_text.clone(),
                    start,
                    end,
                    words: Some(vec![Word {
                        word: word_text,
                        start,
                        end,
                    }]),
                });
            }
        }
    }

    Transcript {
        text: texts.join(" "),
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_payload_normalizes_to_empty() {
        let t = normalize(&Value::Null);
        assert_eq!(t.text, "");
        assert!(t.segments.is_empty());
    }

    #[test]
    fn plain_string_payload() {
        let t = normalize(&json!("hello"));
        assert_eq!(t.text, "hello");
        assert!(t.segments.is_empty());
    }

    #[test]
    fn shape_a_preserves_segments_and_words() {
        let payload = json!({
            "text": "hi there",
            "segments": [
                {"text": "hi there", "start": 0, "end": 1.2, "words": [
                    {"word": "hi", "start": 0, "end": 0.5},
                    {"word": "there", "start": 0.6, "end": 1.2}
                ]}
            ]
        });
        let t = normalize(&payload);
        assert_eq!(t.text, "hi there");
        assert_eq!(t.segments.len(), 1);
        assert_eq!(t.segments[0].words.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn shape_b_fills_text_from_segments_with_fallback_fields() {
        let payload = json!({
            "segments": [
                {"transcript": "hello", "begin": 0.0, "duration": 2.0},
                {"transcript": "world", "seek": 2.0, "end": 3.5}
            ]
        });
        let t = normalize(&payload);
        assert_eq!(t.text, "hello world");
        assert_eq!(t.segments[0].start, 0.0);
        assert_eq!(t.segments[0].end, 2.0);
        assert_eq!(t.segments[1].start, 2.0);
        assert_eq!(t.segments[1].end, 3.5);
    }

    /// S6 in §8: Google shape with seconds/nanos word timings.
    #[test]
    fn shape_c_google_results_scenario_s6() {
        let payload = json!({
            "results": [{
                "alternatives": [{
                    "transcript": "hi there",
                    "words": [
                        {"word": "hi", "startTime": {"seconds": 0, "nanos": 0}, "endTime": {"seconds": 0, "nanos": 500000000}},
                        {"word": "there", "startTime": {"seconds": 0, "nanos": 600000000}, "endTime": {"seconds": 1, "nanos": 200000000}}
                    ]
                }]
            }]
        });
        let t = normalize(&payload);
        assert_eq!(t.text, "hi there");
        assert_eq!(t.segments.len(), 2);
        assert_eq!(t.segments[0].start, 0.0);
        assert_eq!(t.segments[0].end, 0.5);
        assert_eq!(t.segments[1].start, 0.6);
        assert_eq!(t.segments[1].end, 1.2);
    }

    #[test]
    fn unknown_shape_falls_back_to_stringified_value() {
        let payload = json!({"weird": true});
        let t = normalize(&payload);
        assert_eq!(t.segments.len(), 0);
        assert!(t.text.contains("weird"));
    }

    #[test]
    fn normalizer_is_deterministic() {
        let payload = json!({"text": "a", "segments": []});
        assert_eq!(normalize(&payload), normalize(&payload));
    }

    #[test]
    fn non_finite_numbers_default_to_zero() {
        let payload = json!({
            "text": "x",
            "segments": [{"text": "x", "start": null, "end": null}]
        });
        let t = normalize(&payload);
        assert_eq!(t.segments[0].start, 0.0);
        assert_eq!(t.segments[0].end, 0.0);
    }
}
