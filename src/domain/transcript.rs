use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            speaker: None,
            confidence: None,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Word-level timing reported by a provider. Used as realignment anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTiming>,
    pub language: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl TranscriptionResult {
    /// Every timestamp is finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        let valid = |start: f64, end: f64| {
            start.is_finite() && end.is_finite() && start >= 0.0 && end >= 0.0
        };
        self.segments.iter().all(|s| valid(s.start, s.end))
            && self.words.iter().all(|w| valid(w.start, w.end))
            && self.duration_seconds.is_none_or(|d| d.is_finite() && d >= 0.0)
    }

    /// Sorts segments by start and clamps overlaps so they are time-ordered
    /// and non-overlapping. Fills `text` from segments when the provider
    /// left it empty.
    pub fn normalize(&mut self) {
        self.segments
            .sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
        clamp_segments(&mut self.segments);
        self.words.sort_by(|a, b| a.start.total_cmp(&b.start));
        for segment in &mut self.segments {
            segment.text = segment.text.trim().to_string();
        }
        if self.text.trim().is_empty() && !self.segments.is_empty() {
            let separator = if self.language.as_deref().is_some_and(is_unspaced_language) {
                ""
            } else {
                " "
            };
            self.text = join_segment_text(&self.segments, separator);
        }
        self.text = self.text.trim().to_string();
        if self.duration_seconds.is_none() {
            self.duration_seconds = self.segments.last().map(|s| s.end);
        }
    }

    pub fn segments_are_ordered(&self) -> bool {
        segments_are_ordered(&self.segments)
    }
}

pub(crate) fn clamp_segments(segments: &mut [Segment]) {
    let mut floor = 0.0_f64;
    for segment in segments.iter_mut() {
        if segment.start < floor {
            segment.start = floor;
        }
        if segment.end < segment.start {
            segment.end = segment.start;
        }
        floor = segment.end;
    }
}

pub fn segments_are_ordered(segments: &[Segment]) -> bool {
    segments.iter().all(|s| s.start <= s.end)
        && segments.windows(2).all(|w| w[0].end <= w[1].start)
}

pub fn join_segment_text(segments: &[Segment], separator: &str) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn is_unspaced_language(language: &str) -> bool {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    matches!(primary.as_str(), "zh" | "ja" | "yue" | "cmn" | "wuu" | "chinese" | "japanese")
}

