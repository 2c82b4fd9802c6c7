use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use scribeline::application::ports::{BlobStore, JobRepository, LlmClient, QuotaRepository};
use scribeline::application::services::admission::{
    AbuseDetector, AdmissionController, QuotaTracker, RateLimiter,
};
use scribeline::application::services::refinement::RefinementEngine;
use scribeline::application::services::{
    AudioPipeline, JobService, PriorityQueue, ProviderDispatcher, TierSlots, TranscriptionWorker,
    run_pruning,
};
use scribeline::infrastructure::audio::{
    FfmpegTranscoder, HttpClipWorker, HttpMediaFetcher, HttpPlatformResolver, SymphoniaProbe,
};
use scribeline::infrastructure::llm::create_chat_client;
use scribeline::infrastructure::observability::{TracingConfig, init_tracing};
use scribeline::infrastructure::persistence::{
    InMemoryAbuseStore, InMemoryCounterStore, InMemoryJobRepository, InMemoryQueueStore,
    InMemoryQuotaRepository, PgJobRepository, PgQuotaRepository, create_pool, run_migrations,
};
use scribeline::infrastructure::providers::ProviderFactory;
use scribeline::infrastructure::storage::BlobStoreFactory;
use scribeline::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment, ".")?;

    init_tracing(&TracingConfig::from_settings(environment, &settings.logging))?;
    tracing::info!(
        environment = %environment,
        port = settings.server.port,
        "Starting scribeline"
    );
    settings
        .queue
        .priority
        .validate()
        .map_err(anyhow::Error::msg)?;

    let (job_repository, quota_repository): (Arc<dyn JobRepository>, Arc<dyn QuotaRepository>) =
        match &settings.database.url {
            Some(url) => {
                let pool = create_pool(&settings.database, url).await?;
                if settings.database.run_migrations {
                    run_migrations(&pool).await?;
                }
                (
                    Arc::new(PgJobRepository::new(pool.clone())),
                    Arc::new(PgQuotaRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("No database configured, jobs and usage are kept in memory");
                (
                    Arc::new(InMemoryJobRepository::new()),
                    Arc::new(InMemoryQuotaRepository::new()),
                )
            }
        };

    let object_store = BlobStoreFactory::create(&settings.storage)?;
    let url_signer = Arc::new(object_store.signer().clone());
    let blob_store: Arc<dyn BlobStore> = object_store;

    let admission = Arc::new(AdmissionController::new(
        RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            settings.admission.rate.clone(),
        ),
        QuotaTracker::new(quota_repository, settings.admission.quota.clone()),
        AbuseDetector::new(
            Arc::new(InMemoryAbuseStore::new()),
            settings.admission.abuse.clone(),
        ),
    ));
    let queue = Arc::new(PriorityQueue::new(
        Arc::new(InMemoryQueueStore::new()),
        settings.queue.priority.clone(),
    ));

    let audio_settings = &settings.audio;
    let mut audio = AudioPipeline::new(
        Arc::clone(&blob_store),
        Arc::new(HttpMediaFetcher::new(audio_settings.fetch_timeout())?),
        Arc::new(SymphoniaProbe),
        audio_settings.pipeline.clone(),
    )
    .with_transcoder(Arc::new(FfmpegTranscoder::new(
        audio_settings.ffmpeg.binary.clone(),
        audio_settings.ffmpeg.timeout_secs,
    )));
    if let Some(clip_worker) = &audio_settings.clip_worker {
        audio = audio.with_clip_worker(Arc::new(HttpClipWorker::new(
            clip_worker.endpoint.clone(),
            clip_worker.api_key.clone(),
            clip_worker.timeout_secs,
        )));
    }
    for resolver in &audio_settings.resolvers {
        audio = audio.with_resolver(Arc::new(HttpPlatformResolver::new(
            resolver.name.clone(),
            resolver.endpoint.clone(),
            resolver.hosts.clone(),
        )));
    }
    let audio = Arc::new(audio);

    let providers = ProviderFactory::create_all(&settings.providers)?;
    if providers.is_empty() {
        tracing::warn!("No transcription providers configured, every job will fail");
    }
    let dispatcher = Arc::new(ProviderDispatcher::new(providers, settings.dispatch.clone()));
    tracing::info!(providers = ?dispatcher.provider_ids(), mode = ?settings.dispatch.mode, "Provider dispatch ready");

    let llm_client: Option<Arc<dyn LlmClient>> = match &settings.llm {
        Some(llm) => Some(Arc::new(create_chat_client(llm)?)),
        None => None,
    };
    let refinement = Arc::new(RefinementEngine::from_config(
        &settings.refinement,
        llm_client,
    )?);
    tracing::info!(steps = ?refinement.step_names(), "Refinement engine ready");

    let job_service = Arc::new(JobService::new(
        Arc::clone(&job_repository),
        Arc::clone(&admission),
        Arc::clone(&queue),
        Arc::clone(&audio),
        Arc::clone(&blob_store),
        settings.jobs.clone(),
    ));

    let worker = Arc::new(TranscriptionWorker::new(
        queue,
        Arc::new(TierSlots::new(&settings.queue.tiers)),
        job_repository,
        Arc::clone(&admission),
        Arc::clone(&audio),
        dispatcher,
        refinement,
        Arc::clone(&blob_store),
        settings.queue.worker.clone(),
    ));
    worker.recover().await?;

    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(Arc::clone(&worker).run(shutdown.clone()));
    let pruning_handle = tokio::spawn(run_pruning(
        admission,
        audio,
        Duration::from_secs(settings.maintenance.prune_interval_secs.max(1)),
        shutdown.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let state = AppState {
        job_service,
        blob_store,
        url_signer,
        settings: Arc::new(settings),
    };
    let router = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    let _ = tokio::join!(worker_handle, pruning_handle);
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
    }
}
