use std::io::Cursor;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioProbe, ProbeError};

/// Reads container headers to find an audio duration without decoding.
/// Falls back to summing packet durations when the header has no frame
/// count (common for MP3 and streamed containers).
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProbe;

impl AudioProbe for SymphoniaProbe {
    fn duration_seconds(&self, data: &[u8]) -> Result<f64, ProbeError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProbeError::UnknownFormat(e.to_string()))?;

        let mut format = probed.format;
        let track = format.default_track().ok_or(ProbeError::NoAudioTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate)
            && rate > 0
        {
            return Ok(frames as f64 / f64::from(rate));
        }

        let mut total: u64 = 0;
        loop {
            match format.next_packet() {
                Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                Ok(_) => {}
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(ProbeError::DurationUnavailable(format!("packet: {}", e))),
            }
        }

        if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(total);
            return Ok(time.seconds as f64 + time.frac);
        }
        match params.sample_rate {
            Some(rate) if rate > 0 => Ok(total as f64 / f64::from(rate)),
            _ => Err(ProbeError::DurationUnavailable(
                "no time base or sample rate".to_string(),
            )),
        }
    }
}
