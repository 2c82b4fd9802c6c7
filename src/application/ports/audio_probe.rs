pub trait AudioProbe: Send + Sync {
    fn duration_seconds(&self, data: &[u8]) -> Result<f64, ProbeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("unrecognized audio container: {0}")]
    UnknownFormat(String),
    #[error("no audio track found")]
    NoAudioTrack,
    #[error("duration unavailable: {0}")]
    DurationUnavailable(String),
}
