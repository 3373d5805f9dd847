//! 16-bit PCM WAV export

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::info;

use super::{AudioError, AudioSegment};

struct Wav16Writer<W: Write + Seek> {
    out: W,
    data_bytes: u32,
}

impl<W: Write + Seek> Wav16Writer<W> {
    fn create(mut out: W, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        let bits_per_sample: u16 = 16;
        let block_align: u16 = channels.saturating_mul(bits_per_sample / 8);
        let byte_rate: u32 = sample_rate.saturating_mul(block_align as u32);

        // RIFF header with placeholder sizes; patched in finish()
        out.write_all(b"RIFF")?;
        out.write_all(&0u32.to_le_bytes())?;
        out.write_all(b"WAVE")?;

        out.write_all(b"fmt ")?;
        out.write_all(&16u32.to_le_bytes())?;
        out.write_all(&1u16.to_le_bytes())?; // PCM
        out.write_all(&channels.to_le_bytes())?;
        out.write_all(&sample_rate.to_le_bytes())?;
        out.write_all(&byte_rate.to_le_bytes())?;
        out.write_all(&block_align.to_le_bytes())?;
        out.write_all(&bits_per_sample.to_le_bytes())?;

        out.write_all(b"data")?;
        out.write_all(&0u32.to_le_bytes())?;

        Ok(Self { out, data_bytes: 0 })
    }

    fn write_samples(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        for s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            self.out.write_all(&v.to_le_bytes())?;
        }
        let written = u32::try_from(samples.len() * 2)
            .map_err(|_| AudioError::Format("segment too large for WAV".into()))?;
        self.data_bytes = self
            .data_bytes
            .checked_add(written)
            .ok_or_else(|| AudioError::Format("segment too large for WAV".into()))?;
        Ok(())
    }

    fn finish(mut self) -> Result<W, AudioError> {
        let riff_size = 36u32.saturating_add(self.data_bytes);
        self.out.seek(SeekFrom::Start(4))?;
        self.out.write_all(&riff_size.to_le_bytes())?;
        self.out.seek(SeekFrom::Start(40))?;
        self.out.write_all(&self.data_bytes.to_le_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Write `segment` to any seekable sink as a WAV stream
pub fn encode_wav<W: Write + Seek>(segment: &AudioSegment, out: W) -> Result<W, AudioError> {
    let mut writer = Wav16Writer::create(out, segment.sample_rate(), segment.channels())?;
    writer.write_samples(segment.samples())?;
    writer.finish()
}

/// Export `segment` as a 16-bit WAV file
pub fn write_wav(segment: &AudioSegment, path: impl AsRef<Path>) -> Result<(), AudioError> {
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    encode_wav(segment, file)?;
    info!(path = %path.display(), ms = segment.len_ms(), "exported wav");
    Ok(())
}
