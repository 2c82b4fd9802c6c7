use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::application::ports::{
    CLIP_CHANNELS, CLIP_SAMPLE_RATE, ClipError, ClipParams, LocalTranscoder,
};

/// Clips through an `ffmpeg` child process, piping audio in on stdin and
/// reading 16 kHz mono PCM WAV from stdout.
pub struct FfmpegTranscoder {
    binary: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn args(params: &ClipParams) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        if params.offset_seconds > 0 {
            args.push("-ss".into());
            args.push(params.offset_seconds.to_string());
        }
        args.extend(["-i".into(), "pipe:0".into()]);
        if params.target_seconds < u32::MAX {
            args.push("-t".into());
            args.push(params.target_seconds.to_string());
        }
        args.extend([
            "-vn".into(),
            "-ac".into(),
            CLIP_CHANNELS.to_string(),
            "-ar".into(),
            CLIP_SAMPLE_RATE.to_string(),
            "-c:a".into(),
            "pcm_s16le".into(),
            "-f".into(),
            "wav".into(),
            "pipe:1".into(),
        ]);
        args
    }
}

#[async_trait]
impl LocalTranscoder for FfmpegTranscoder {
    async fn clip(&self, audio: &[u8], params: &ClipParams) -> Result<Vec<u8>, ClipError> {
        let mut child = Command::new(&self.binary)
            .args(Self::args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClipError::ProcessFailed(format!("spawn '{}': {}", self.binary, e)))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // stdin is fed from its own task so a full stdout pipe cannot stall it.
        let input = audio.to_vec();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut pipe) = stdin {
                pipe.write_all(&input).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        });
        let stdout_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            if let Some(mut out) = stdout {
                out.read_to_end(&mut buffer).await?;
            }
            Ok::<Vec<u8>, std::io::Error>(buffer)
        });
        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            if let Some(mut err) = stderr {
                err.read_to_end(&mut buffer).await?;
            }
            Ok::<Vec<u8>, std::io::Error>(buffer)
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(ClipError::ProcessFailed(format!("wait: {}", e))),
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                return Err(ClipError::Timeout(self.timeout.as_secs()));
            }
        };

        if let Ok(Err(e)) = stdin_task.await {
            // ffmpeg may close stdin early once it has read enough input.
            tracing::debug!(error = %e, "ffmpeg stdin closed before all input was written");
        }
        let output = match stdout_task.await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(ClipError::ProcessFailed(format!("read stdout: {}", e))),
            Err(e) => return Err(ClipError::ProcessFailed(format!("stdout task: {}", e))),
        };
        let diagnostics = match stderr_task.await {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            _ => String::new(),
        };

        if !status.success() {
            return Err(ClipError::ProcessFailed(format!(
                "ffmpeg exited with {}: {}",
                status, diagnostics
            )));
        }
        if output.is_empty() {
            return Err(ClipError::EmptyOutput);
        }
        tracing::debug!(bytes = output.len(), "ffmpeg clip produced");
        Ok(output)
    }
}
