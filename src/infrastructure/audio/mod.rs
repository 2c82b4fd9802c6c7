mod ffmpeg_transcoder;
mod http_clip_worker;
mod http_media_fetcher;
mod http_platform_resolver;
mod symphonia_probe;

pub use ffmpeg_transcoder::FfmpegTranscoder;
pub use http_clip_worker::HttpClipWorker;
pub use http_media_fetcher::HttpMediaFetcher;
pub use http_platform_resolver::HttpPlatformResolver;
pub use symphonia_probe::SymphoniaProbe;
