use serde::Deserialize;

use crate::domain::{Segment, TranscriptionResult, WordTiming};

/// Body of a `verbose_json` transcription response.
#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<VerboseSegment>,
    #[serde(default)]
    pub words: Vec<VerboseWord>,
}

#[derive(Debug, Deserialize)]
pub struct VerboseSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub avg_logprob: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VerboseWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl From<VerboseTranscription> for TranscriptionResult {
    fn from(body: VerboseTranscription) -> Self {
        let segments = body
            .segments
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text,
                speaker: None,
                confidence: s.avg_logprob.map(|lp| lp.exp().clamp(0.0, 1.0) as f32),
            })
            .collect();
        let words = body
            .words
            .into_iter()
            .map(|w| WordTiming {
                start: w.start,
                end: w.end,
                text: w.word,
            })
            .collect();
        TranscriptionResult {
            text: body.text,
            segments,
            words,
            language: body.language.map(|l| language_code(&l)),
            duration_seconds: body.duration,
        }
    }
}

/// Whisper reports languages by English name ("chinese"); callers and the
/// refinement engine expect short tags.
pub fn language_code(reported: &str) -> String {
    let lowered = reported.trim().to_lowercase();
    let code = match lowered.as_str() {
        "chinese" | "mandarin" => "zh",
        "cantonese" => "yue",
        "japanese" => "ja",
        "korean" => "ko",
        "english" => "en",
        "german" => "de",
        "french" => "fr",
        "spanish" => "es",
        "norwegian" => "no",
        "russian" => "ru",
        _ => return lowered,
    };
    code.to_string()
}
