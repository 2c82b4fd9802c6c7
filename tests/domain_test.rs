use chrono::{TimeDelta, Utc};

use scribeline::domain::{
    AccuracyMode, AudioAsset, IdentityKey, JobId, JobKind, JobOptions, JobStatus, OutputFormat,
    PublicStatus, Segment, SourceDescriptor, SourceKind, StoragePath, Tier, TranscriptionResult,
    WordTiming, content_type_for_extension, extension_for_content_type, join_segment_text,
    segments_are_ordered,
};

#[test]
fn given_each_status_when_checking_transitions_then_only_next_step_or_failure_is_allowed() {
    assert!(JobStatus::Submitted.can_transition_to(JobStatus::Queued));
    assert!(JobStatus::Queued.can_transition_to(JobStatus::Downloading));
    assert!(JobStatus::Refining.can_transition_to(JobStatus::Completed));
    assert!(JobStatus::Downloading.can_transition_to(JobStatus::Failed));

    assert!(!JobStatus::Queued.can_transition_to(JobStatus::Transcribing));
    assert!(!JobStatus::Transcribing.can_transition_to(JobStatus::Downloading));
    assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
    assert!(!JobStatus::Failed.can_transition_to(JobStatus::Failed));
}

#[test]
fn given_internal_statuses_when_made_public_then_they_collapse_with_monotonic_progress() {
    let pipeline = [
        JobStatus::Submitted,
        JobStatus::Queued,
        JobStatus::Downloading,
        JobStatus::Transcribing,
        JobStatus::Refining,
        JobStatus::Completed,
    ];

    assert!(pipeline.windows(2).all(|w| w[0].progress() < w[1].progress()));
    assert_eq!(JobStatus::Queued.public(), PublicStatus::Pending);
    assert_eq!(JobStatus::Transcribing.public(), PublicStatus::Processing);
    assert_eq!(JobStatus::Failed.public(), PublicStatus::Failed);
    assert!(PublicStatus::Completed.is_terminal());
    assert!(!PublicStatus::Processing.is_terminal());
}

#[test]
fn given_status_names_when_parsed_then_round_trip_through_display() {
    for status in [
        JobStatus::Submitted,
        JobStatus::Queued,
        JobStatus::Refining,
        JobStatus::Failed,
    ] {
        assert_eq!(status.to_string().parse::<JobStatus>(), Ok(status));
    }
    assert!("queued".parse::<JobStatus>().is_err());
}

#[test]
fn given_sources_when_validated_then_kind_specific_rules_apply() {
    assert!(SourceDescriptor::new(SourceKind::RemoteUrl, "https://a.example/x.mp3")
        .validate()
        .is_ok());
    assert!(SourceDescriptor::new(SourceKind::Platform, "http://video.example/watch?v=1")
        .validate()
        .is_ok());
    assert!(SourceDescriptor::new(SourceKind::StoredFile, "uploads/abc/talk.wav")
        .validate()
        .is_ok());

    let empty = SourceDescriptor::new(SourceKind::RemoteUrl, "   ").validate();
    let ftp = SourceDescriptor::new(SourceKind::RemoteUrl, "ftp://a.example/x").validate();
    let traversal = SourceDescriptor::new(SourceKind::StoredFile, "uploads/../secrets").validate();

    assert_eq!(empty, Err("source reference is empty".to_string()));
    assert!(ftp.unwrap_err().contains("not an http(s) URL"));
    assert!(traversal.unwrap_err().contains("invalid stored file reference"));
}

#[test]
fn given_source_json_when_deserialized_then_kind_uses_snake_case() {
    let source: SourceDescriptor =
        serde_json::from_str(r#"{"kind": "stored_file", "reference": "uploads/1/a.wav"}"#)
            .unwrap();

    assert_eq!(source.kind, SourceKind::StoredFile);
    assert_eq!("platform".parse::<SourceKind>(), Ok(SourceKind::Platform));
}

#[test]
fn given_hostile_filename_when_building_upload_path_then_it_is_sanitized() {
    let id = uuid::Uuid::nil();

    assert_eq!(
        StoragePath::upload(id, "../my talk (final).wav").as_str(),
        "uploads/00000000-0000-0000-0000-000000000000/_my_talk__final_.wav"
    );
    assert!(StoragePath::upload(id, "...").as_str().ends_with("/upload"));
}

#[test]
fn given_job_id_when_building_paths_then_layout_is_stable() {
    let job_id = JobId::new();

    assert_eq!(
        StoragePath::job_audio(&job_id, "clip.wav").as_str(),
        format!("audio/{}/clip.wav", job_id)
    );
    assert_eq!(
        StoragePath::transcript(&job_id, "srt").to_string(),
        format!("transcripts/{}.srt", job_id)
    );
}

#[test]
fn given_identity_keys_when_encoded_then_storage_keys_round_trip() {
    let account = IdentityKey::Account("42".to_string());
    let anonymous = IdentityKey::Fingerprint("ab12".to_string());

    assert_eq!(account.storage_key(), "acct:42");
    assert_eq!(anonymous.to_string(), "fp:ab12");
    assert!(anonymous.is_anonymous());
    assert_eq!(IdentityKey::parse_storage_key("acct:42"), Some(account));
    assert_eq!(IdentityKey::parse_storage_key("fp:ab12"), Some(anonymous));
    assert_eq!(IdentityKey::parse_storage_key("user:42"), None);
}

#[test]
fn given_tier_names_when_parsed_then_case_is_ignored() {
    assert_eq!("PRO".parse::<Tier>(), Ok(Tier::Pro));
    assert!("gold".parse::<Tier>().is_err());
    assert!(Tier::Free < Tier::Premium);
}

#[test]
fn given_job_options_when_classified_then_preview_wins_over_accuracy() {
    let mut options = JobOptions::default();
    assert_eq!(options.kind(), JobKind::Standard);
    assert_eq!(options.formats, vec![OutputFormat::Text, OutputFormat::Json]);

    options.accuracy = AccuracyMode::High;
    assert_eq!(options.kind(), JobKind::HighAccuracy);

    options.max_seconds = Some(60);
    assert_eq!(options.kind(), JobKind::Preview);
}

#[test]
fn given_empty_options_json_when_deserialized_then_defaults_apply() {
    let options: JobOptions = serde_json::from_str("{}").unwrap();

    assert_eq!(options, JobOptions::default());
}

#[test]
fn given_unordered_overlapping_segments_when_normalized_then_sorted_clamped_and_text_filled() {
    let mut result = TranscriptionResult {
        text: "  ".to_string(),
        segments: vec![
            Segment::new(4.0, 6.0, " second "),
            Segment::new(0.0, 5.0, "first"),
        ],
        language: Some("en".to_string()),
        ..TranscriptionResult::default()
    };

    result.normalize();

    assert_eq!(result.segments[0].text, "first");
    assert_eq!(result.segments[1].start, 5.0);
    assert_eq!(result.segments[1].end, 6.0);
    assert!(result.segments_are_ordered());
    assert_eq!(result.text, "first second");
    assert_eq!(result.duration_seconds, Some(6.0));
}

#[test]
fn given_chinese_segments_when_normalized_then_text_is_joined_without_spaces() {
    let mut result = TranscriptionResult {
        segments: vec![Segment::new(0.0, 1.0, "你好"), Segment::new(1.0, 2.0, "世界")],
        language: Some("zh-CN".to_string()),
        ..TranscriptionResult::default()
    };

    result.normalize();

    assert_eq!(result.text, "你好世界");
}

#[test]
fn given_negative_or_nan_timings_when_checked_then_result_is_not_well_formed() {
    let good = TranscriptionResult {
        segments: vec![Segment::new(0.0, 1.0, "a")],
        ..TranscriptionResult::default()
    };
    let negative = TranscriptionResult {
        segments: vec![Segment::new(-1.0, 1.0, "a")],
        ..TranscriptionResult::default()
    };
    let nan_word = TranscriptionResult {
        words: vec![WordTiming {
            start: f64::NAN,
            end: 1.0,
            text: "a".to_string(),
        }],
        ..TranscriptionResult::default()
    };

    assert!(good.is_well_formed());
    assert!(!negative.is_well_formed());
    assert!(!nan_word.is_well_formed());
}

#[test]
fn given_segments_when_joined_then_blank_text_is_skipped() {
    let segments = vec![
        Segment::new(0.0, 1.0, " a "),
        Segment::new(1.0, 2.0, "  "),
        Segment::new(2.0, 3.0, "b"),
    ];

    assert_eq!(join_segment_text(&segments, " "), "a b");
    assert!(segments_are_ordered(&segments));
    assert!(!segments_are_ordered(&[
        Segment::new(0.0, 2.0, "a"),
        Segment::new(1.0, 3.0, "b")
    ]));
}

#[test]
fn given_media_types_when_mapped_then_extensions_and_content_types_agree() {
    assert_eq!(extension_for_content_type("audio/mpeg; charset=binary"), "mp3");
    assert_eq!(extension_for_content_type("AUDIO/X-WAV"), "wav");
    assert_eq!(extension_for_content_type("text/html"), "bin");
    assert_eq!(content_type_for_extension("MP3"), "audio/mpeg");
    assert_eq!(content_type_for_extension("xyz"), "application/octet-stream");
}

#[test]
fn given_asset_when_checking_expiry_then_boundary_counts_as_expired() {
    let now = Utc::now();
    let job_id = JobId::new();
    let asset = AudioAsset {
        job_id,
        path: StoragePath::job_audio(&job_id, "source.m4a"),
        source_reference: "https://a.example/x.m4a".to_string(),
        url: "http://localhost/blobs/x".to_string(),
        content_type: "audio/mp4".to_string(),
        duration_seconds: None,
        clipped: false,
        owned: true,
        expires_at: now + TimeDelta::minutes(5),
    };

    assert_eq!(asset.extension(), "m4a");
    assert!(!asset.is_expired(now));
    assert!(asset.is_expired(now + TimeDelta::minutes(5)));
}
