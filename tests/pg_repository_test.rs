mod helpers;

use chrono::NaiveDate;

use helpers::test_postgres::TestPostgres;
use scribeline::application::ports::{
    JobRepository, QuotaRepository, RepositoryError, UsageDelta, UsageSnapshot,
};
use scribeline::domain::{
    AccuracyMode, IdentityKey, Job, JobOptions, JobStatus, OutputFormat, Segment,
    SourceDescriptor, SourceKind, Tier, TranscriptionResult,
};

fn job(owner: &str) -> Job {
    let options = JobOptions {
        language: Some("zh".to_string()),
        formats: vec![OutputFormat::Srt],
        accuracy: AccuracyMode::High,
        max_seconds: Some(120),
        offset_seconds: 15,
    };
    Job::new(
        IdentityKey::Account(owner.to_string()),
        Tier::Pro,
        SourceDescriptor::new(SourceKind::Platform, "https://video.example/watch?v=1"),
        options,
        2.0,
    )
}

#[tokio::test]
#[ignore = "requires docker"]
async fn given_new_job_when_creating_and_retrieving_then_job_is_persisted() {
    let test_pg = TestPostgres::new().await;
    let job = job("alice");

    test_pg
        .job_repository
        .create(&job)
        .await
        .expect("Failed to create job");

    let retrieved = test_pg
        .job_repository
        .get_by_id(job.id)
        .await
        .expect("Failed to retrieve job")
        .expect("Job not found");

    assert_eq!(retrieved.id, job.id);
    assert_eq!(retrieved.owner, job.owner);
    assert_eq!(retrieved.tier, Tier::Pro);
    assert_eq!(retrieved.source, job.source);
    assert_eq!(retrieved.options, job.options);
    assert_eq!(retrieved.status, JobStatus::Submitted);
    assert!(matches!(
        test_pg.job_repository.create(&job).await,
        Err(RepositoryError::ConstraintViolation(_))
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn given_stale_expected_status_when_updating_then_row_is_untouched() {
    let test_pg = TestPostgres::new().await;
    let repository = &test_pg.job_repository;
    let job = job("alice");
    repository.create(&job).await.unwrap();

    assert!(
        repository
            .update_status(job.id, JobStatus::Submitted, JobStatus::Queued, None)
            .await
            .unwrap()
    );
    assert!(
        !repository
            .update_status(job.id, JobStatus::Submitted, JobStatus::Failed, Some("late"))
            .await
            .unwrap()
    );
    assert!(
        repository
            .update_status(job.id, JobStatus::Queued, JobStatus::Failed, Some("cancelled"))
            .await
            .unwrap()
    );

    let stored = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("cancelled"));
    let failed = repository.list_by_status(JobStatus::Failed).await.unwrap();
    assert_eq!(failed.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn given_saved_result_when_reading_back_then_segments_and_provider_survive() {
    let test_pg = TestPostgres::new().await;
    let repository = &test_pg.job_repository;
    let job = job("bob");
    repository.create(&job).await.unwrap();
    let mut segment = Segment::new(0.0, 2.0, "你好。");
    segment.speaker = Some("A".to_string());
    let result = TranscriptionResult {
        text: "你好。".to_string(),
        segments: vec![segment],
        language: Some("zh".to_string()),
        duration_seconds: Some(2.0),
        ..TranscriptionResult::default()
    };

    repository.save_result(job.id, "azure", &result).await.unwrap();
    repository.set_warning(job.id, "realignment skipped").await.unwrap();
    repository.set_priority(job.id, 1250).await.unwrap();

    assert_eq!(repository.get_result(job.id).await.unwrap(), Some(result));
    let stored = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.provider_id.as_deref(), Some("azure"));
    assert_eq!(stored.warning.as_deref(), Some("realignment skipped"));
    assert_eq!(stored.priority, 1250);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn given_usage_recorded_twice_when_reading_then_counters_accumulate_per_window() {
    let test_pg = TestPostgres::new().await;
    let repository = &test_pg.quota_repository;
    let identity = IdentityKey::Fingerprint("fp-1".to_string());
    let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let month = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let delta = UsageDelta {
        requests: 1,
        minutes: 2.5,
        high_accuracy_minutes: 2.5,
    };

    repository.record(&identity, day, month, delta).await.unwrap();
    repository.record(&identity, day, month, delta).await.unwrap();

    let usage = repository.usage(&identity, day, month).await.unwrap();
    let next_day = repository
        .usage(&identity, day.succ_opt().unwrap(), month)
        .await
        .unwrap();
    assert_eq!(
        usage,
        UsageSnapshot {
            daily_requests: 2,
            monthly_minutes: 5.0,
            monthly_high_accuracy_minutes: 5.0,
        }
    );
    assert_eq!(next_day.daily_requests, 0);
    assert_eq!(next_day.monthly_minutes, 5.0);
}
