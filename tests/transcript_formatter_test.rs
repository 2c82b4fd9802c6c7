mod helpers;

use helpers::fakes::result_with;
use scribeline::application::services::{render_transcript, timestamp};
use scribeline::domain::{OutputFormat, Segment, TranscriptionResult};

fn two_speaker_result() -> TranscriptionResult {
    let mut first = Segment::new(0.0, 2.5, "Welcome to the show.");
    first.speaker = Some("Host".to_string());
    let mut result = result_with(
        "en",
        vec![
            first,
            Segment::new(2.5, 3.0, "   "),
            Segment::new(3.0, 3661.042, "Thanks for having me."),
        ],
    );
    result.text = "  Welcome to the show. Thanks for having me. ".to_string();
    result
}

#[test]
fn given_seconds_when_formatted_then_hours_minutes_seconds_and_millis_are_padded() {
    assert_eq!(timestamp(0.0, ','), "00:00:00,000");
    assert_eq!(timestamp(61.5, ','), "00:01:01,500");
    assert_eq!(timestamp(3661.042, '.'), "01:01:01.042");
    assert_eq!(timestamp(-3.0, ','), "00:00:00,000");
}

#[test]
fn given_result_when_rendered_as_text_then_trimmed_with_trailing_newline() {
    let rendered = render_transcript(&two_speaker_result(), OutputFormat::Text).unwrap();

    assert_eq!(rendered, "Welcome to the show. Thanks for having me.\n");
}

#[test]
fn given_result_when_rendered_as_srt_then_cues_are_numbered_and_blank_segments_skipped() {
    let rendered = render_transcript(&two_speaker_result(), OutputFormat::Srt).unwrap();

    assert_eq!(
        rendered,
        "1\n00:00:00,000 --> 00:00:02,500\nHost: Welcome to the show.\n\n\
         2\n00:00:03,000 --> 01:01:01,042\nThanks for having me.\n\n"
    );
}

#[test]
fn given_result_when_rendered_as_vtt_then_header_and_dot_separators_are_used() {
    let rendered = render_transcript(&two_speaker_result(), OutputFormat::Vtt).unwrap();

    assert!(rendered.starts_with("WEBVTT\n\n"));
    assert!(rendered.contains("00:00:00.000 --> 00:00:02.500\nHost: Welcome to the show.\n"));
    assert_eq!(rendered.matches(" --> ").count(), 2);
}

#[test]
fn given_result_when_rendered_as_json_then_it_parses_back_to_the_same_result() {
    let result = two_speaker_result();

    let rendered = render_transcript(&result, OutputFormat::Json).unwrap();

    let parsed: TranscriptionResult = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed, result);
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["segments"][0]["speaker"], "Host");
    assert!(value["segments"][1].get("speaker").is_none());
    assert_eq!(value["language"], "en");
}

#[test]
fn given_empty_result_when_rendered_then_subtitle_formats_have_no_cues() {
    let empty = TranscriptionResult::default();

    assert_eq!(render_transcript(&empty, OutputFormat::Srt).unwrap(), "");
    assert_eq!(
        render_transcript(&empty, OutputFormat::Vtt).unwrap(),
        "WEBVTT\n\n"
    );
    assert_eq!(render_transcript(&empty, OutputFormat::Text).unwrap(), "\n");
}

#[test]
fn given_format_names_when_parsed_then_aliases_and_case_are_accepted() {
    assert_eq!("txt".parse::<OutputFormat>(), Ok(OutputFormat::Text));
    assert_eq!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Text));
    assert_eq!("Srt".parse::<OutputFormat>(), Ok(OutputFormat::Srt));
    assert!("docx".parse::<OutputFormat>().is_err());
    assert_eq!(OutputFormat::Vtt.extension(), "vtt");
    assert_eq!(OutputFormat::Srt.content_type(), "application/x-subrip");
}
