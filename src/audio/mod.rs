//! Audio collaborators: the in-memory segment, file decoding, WAV export and
//! playback.

pub mod decode;
pub mod playback;
pub mod segment;
pub mod wav;

use std::io;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

pub use decode::decode_file;
pub use playback::play;
pub use segment::{AudioSegment, MAX_SAMPLES};
pub use wav::write_wav;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("decoder error: {0}")]
    Symphonia(#[from] SymphoniaError),

    #[error("missing audio track")]
    MissingTrack,

    #[error("missing sample rate in codec parameters")]
    MissingSampleRate,

    #[error("invalid audio format: {0}")]
    Format(String),

    #[error("clip too long: {samples} samples exceeds the limit of {limit}")]
    TooLarge { samples: u128, limit: usize },

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("playback is not available in this build")]
    PlaybackUnavailable,

    #[error("playback failed: {0}")]
    Playback(String),
}
