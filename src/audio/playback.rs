//! Blocking playback
//!
//! Occupies the caller until the segment has finished playing. Only built
//! with the `playback` feature; otherwise `play` reports that playback is
//! unavailable.

use super::{AudioError, AudioSegment};

#[cfg(feature = "playback")]
pub fn play(segment: &AudioSegment) -> Result<(), AudioError> {
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};

    let (_stream, handle) =
        OutputStream::try_default().map_err(|e| AudioError::Playback(e.to_string()))?;
    let sink = Sink::try_new(&handle).map_err(|e| AudioError::Playback(e.to_string()))?;

    tracing::debug!(ms = segment.len_ms(), "playback started");
    sink.append(SamplesBuffer::new(
        segment.channels(),
        segment.sample_rate(),
        segment.samples().to_vec(),
    ));
    sink.sleep_until_end();
    tracing::debug!("playback finished");
    Ok(())
}

#[cfg(not(feature = "playback"))]
pub fn play(_segment: &AudioSegment) -> Result<(), AudioError> {
    Err(AudioError::PlaybackUnavailable)
}
