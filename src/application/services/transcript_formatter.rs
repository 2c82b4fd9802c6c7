use crate::domain::{OutputFormat, Segment, TranscriptionResult};

pub fn render(result: &TranscriptionResult, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        OutputFormat::Srt => Ok(render_srt(&result.segments)),
        OutputFormat::Vtt => Ok(render_vtt(&result.segments)),
        OutputFormat::Json => serde_json::to_string_pretty(result),
    }
}

fn render_text(result: &TranscriptionResult) -> String {
    let mut text = result.text.trim().to_string();
    text.push('\n');
    text
}

fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (index, segment) in cue_segments(segments).enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            timestamp(segment.start, ','),
            timestamp(segment.end, ','),
            cue_text(segment)
        ));
    }
    out
}

fn render_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in cue_segments(segments) {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            timestamp(segment.start, '.'),
            timestamp(segment.end, '.'),
            cue_text(segment)
        ));
    }
    out
}

fn cue_segments(segments: &[Segment]) -> impl Iterator<Item = &Segment> {
    segments.iter().filter(|s| !s.text.trim().is_empty())
}

fn cue_text(segment: &Segment) -> String {
    match &segment.speaker {
        Some(speaker) => format!("{}: {}", speaker, segment.text.trim()),
        None => segment.text.trim().to_string(),
    }
}

/// `HH:MM:SS,mmm` (SRT) or `HH:MM:SS.mmm` (WebVTT).
pub fn timestamp(seconds: f64, separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, millis)
}
