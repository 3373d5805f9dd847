//! Millisecond-addressed audio buffer
//!
//! Samples are interleaved `f32` in `[-1.0, 1.0]`. All positions taken by
//! the public methods are milliseconds and are clamped to the segment, so a
//! caller holding a normalized address never indexes out of bounds.
//!
//! Operations that grow a clip are fallible: the result is sized with
//! checked arithmetic against [`MAX_SAMPLES`] and allocated with
//! `try_reserve_exact`, so an oversized request becomes an error instead of
//! an abort.

use mw_core::Millis;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::AudioError;

/// Largest buffer any operation will build, about 3.4 hours of 44.1 kHz stereo
pub const MAX_SAMPLES: usize = 1 << 30;

const RESAMPLE_CHUNK_FRAMES: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioSegment {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::Format("sample rate must be > 0".into()));
        }
        if channels == 0 {
            return Err(AudioError::Format("channels must be > 0".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(AudioError::Format(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Digital silence of `duration` ms
    pub fn silent(duration: Millis, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        let sample_rate = sample_rate.max(1);
        let channels = channels.max(1);
        let frames = (duration as u128 * sample_rate as u128 + 500) / 1000;
        let len = checked_len(frames * channels as u128)?;
        let mut samples = buffer(len)?;
        samples.resize(len, 0.0);
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Length in milliseconds, rounded to the nearest
    pub fn len_ms(&self) -> Millis {
        let frames = self.frames() as u64;
        let rate = self.sample_rate as u64;
        (frames * 1000 + rate / 2) / rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn frame_at(&self, ms: Millis) -> usize {
        ms_to_frames(ms, self.sample_rate).min(self.frames())
    }

    fn sample_at(&self, ms: Millis) -> usize {
        self.frame_at(ms) * self.channels as usize
    }

    fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples,
        }
    }

    /// Copy of `[start, end)`
    pub fn slice(&self, start: Millis, end: Millis) -> Self {
        let a = self.sample_at(start);
        let b = self.sample_at(end).max(a);
        self.with_samples(self.samples[a..b].to_vec())
    }

    /// `self` followed by `other`, converted to this segment's format
    pub fn concat(&self, other: &AudioSegment) -> Result<Self, AudioError> {
        let other = other.conform(self.sample_rate, self.channels)?;
        let len = checked_len(self.samples.len() as u128 + other.samples.len() as u128)?;
        let mut samples = buffer(len)?;
        samples.extend_from_slice(&self.samples);
        samples.extend_from_slice(&other.samples);
        Ok(self.with_samples(samples))
    }

    pub fn insert_silence(&self, at: Millis, duration: Millis) -> Result<Self, AudioError> {
        let silence = Self::silent(duration, self.sample_rate, self.channels)?;
        let len = checked_len(self.samples.len() as u128 + silence.samples.len() as u128)?;
        let split = self.sample_at(at);
        let mut samples = buffer(len)?;
        samples.extend_from_slice(&self.samples[..split]);
        samples.extend_from_slice(&silence.samples);
        samples.extend_from_slice(&self.samples[split..]);
        Ok(self.with_samples(samples))
    }

    /// Zero the samples in `[at, at + duration)`, keeping the length
    pub fn replace_with_silence(&self, at: Millis, duration: Millis) -> Self {
        let a = self.sample_at(at);
        let b = self.sample_at(at.saturating_add(duration));
        let mut samples = self.samples.clone();
        samples[a..b].iter_mut().for_each(|s| *s = 0.0);
        self.with_samples(samples)
    }

    /// Linear ramp from silence over the first `duration` ms
    pub fn fade_in(&self, duration: Millis) -> Self {
        let frames = self.frame_at(duration);
        let mut out = self.clone();
        if frames == 0 {
            return out;
        }
        let ch = self.channels as usize;
        for (i, frame) in out.samples.chunks_mut(ch).take(frames).enumerate() {
            let gain = i as f32 / frames as f32;
            frame.iter_mut().for_each(|s| *s *= gain);
        }
        out
    }

    /// Linear ramp to silence over the last `duration` ms
    pub fn fade_out(&self, duration: Millis) -> Self {
        let frames = self.frame_at(duration);
        let mut out = self.clone();
        if frames == 0 {
            return out;
        }
        let ch = self.channels as usize;
        let start = self.frames() - frames;
        for (i, frame) in out.samples.chunks_mut(ch).skip(start).enumerate() {
            let gain = 1.0 - (i + 1) as f32 / frames as f32;
            frame.iter_mut().for_each(|s| *s *= gain);
        }
        out
    }

    /// Mix `other` into this segment; the result keeps this segment's length
    pub fn overlay(&self, other: &AudioSegment) -> Result<Self, AudioError> {
        let other = other.conform(self.sample_rate, self.channels)?;
        let mut samples = self.samples.clone();
        for (dst, src) in samples.iter_mut().zip(other.samples.iter()) {
            *dst = (*dst + *src).clamp(-1.0, 1.0);
        }
        Ok(self.with_samples(samples))
    }

    pub fn repeat(&self, count: u64) -> Result<Self, AudioError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let len = checked_len(self.samples.len() as u128 * count as u128)?;
        let mut samples = buffer(len)?;
        for _ in 0..count {
            samples.extend_from_slice(&self.samples);
        }
        Ok(self.with_samples(samples))
    }

    /// Scale `[start, end)` so its peak sits at `peak_dbfs`
    ///
    /// A silent range is left untouched. A level whose gain is not a finite
    /// number is rejected.
    pub fn normalize_range(
        &self,
        start: Millis,
        end: Millis,
        peak_dbfs: f64,
    ) -> Result<Self, AudioError> {
        let a = self.sample_at(start);
        let b = self.sample_at(end).max(a);
        let peak = peak_of(&self.samples[a..b]);
        let mut out = self.clone();
        if peak <= 0.0 {
            return Ok(out);
        }
        let gain = (10f64.powf(peak_dbfs / 20.0) / peak as f64) as f32;
        if !gain.is_finite() {
            return Err(AudioError::Format(format!(
                "cannot normalize to {peak_dbfs} dBFS"
            )));
        }
        out.samples[a..b]
            .iter_mut()
            .for_each(|s| *s = (*s * gain).clamp(-1.0, 1.0));
        Ok(out)
    }

    /// Convert to another rate and channel count
    ///
    /// Channels are averaged down to mono or mapped round-robin otherwise;
    /// the rate change goes through a sinc resampler.
    pub fn conform(&self, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        let remapped = self.remap_channels(channels.max(1))?;
        remapped.resample(sample_rate.max(1))
    }

    fn remap_channels(&self, channels: u16) -> Result<Self, AudioError> {
        if channels == self.channels {
            return Ok(self.clone());
        }
        let src = self.channels as usize;
        let dst = channels as usize;
        let mut samples = buffer(checked_len(self.frames() as u128 * dst as u128)?)?;
        for frame in self.samples.chunks(src) {
            if dst == 1 {
                samples.push(frame.iter().sum::<f32>() / src as f32);
            } else {
                samples.extend((0..dst).map(|c| frame[c % src]));
            }
        }
        Ok(Self {
            sample_rate: self.sample_rate,
            channels,
            samples,
        })
    }

    fn resample(&self, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == self.sample_rate || self.is_empty() {
            return Ok(Self {
                sample_rate,
                channels: self.channels,
                samples: self.samples.clone(),
            });
        }

        let ch = self.channels as usize;
        let src_frames = self.frames();
        let src_rate = self.sample_rate as u128;
        let dst_frames = (src_frames as u128 * sample_rate as u128 + src_rate / 2) / src_rate;
        let dst_len = checked_len(dst_frames * ch as u128)?;
        let dst_frames = dst_len / ch;

        let params = SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.94,
            oversampling_factor: 128,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::Blackman,
        };
        let ratio = sample_rate as f64 / self.sample_rate as f64;
        let mut resampler =
            SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK_FRAMES, ch)
                .map_err(|e| AudioError::Resample(e.to_string()))?;

        let planar: Vec<Vec<f32>> = (0..ch)
            .map(|c| self.samples.iter().skip(c).step_by(ch).copied().collect())
            .collect();

        // the resampler's output starts `delay` frames late
        let delay = resampler.output_delay();
        let wanted = delay + dst_frames;
        let mut resampled: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); ch];
        let mut pos = 0;
        while resampled[0].len() < wanted {
            let next = resampler.input_frames_next();
            let block = if pos + next <= src_frames {
                let chunk: Vec<&[f32]> = planar.iter().map(|p| &p[pos..pos + next]).collect();
                pos += next;
                resampler.process(chunk.as_slice(), None)
            } else if pos < src_frames {
                let chunk: Vec<&[f32]> = planar.iter().map(|p| &p[pos..]).collect();
                pos = src_frames;
                resampler.process_partial(Some(chunk.as_slice()), None)
            } else {
                resampler.process_partial(None::<&[&[f32]]>, None)
            };
            let block = block.map_err(|e| AudioError::Resample(e.to_string()))?;
            if block.first().map_or(true, Vec::is_empty) {
                break;
            }
            for (dst, src) in resampled.iter_mut().zip(block) {
                dst.extend(src);
            }
        }

        let mut samples = buffer(dst_len)?;
        for i in delay..wanted {
            samples.extend(resampled.iter().map(|c| c.get(i).copied().unwrap_or(0.0)));
        }
        Ok(Self {
            sample_rate,
            channels: self.channels,
            samples,
        })
    }

    /// Per-column peak levels, used for text waveforms
    pub fn peaks(&self, columns: usize) -> Vec<f32> {
        if columns == 0 || self.is_empty() {
            return vec![0.0; columns];
        }
        let ch = self.channels as usize;
        let frames = self.frames();
        (0..columns)
            .map(|col| {
                let a = col * frames / columns;
                let b = ((col + 1) * frames / columns).max(a + 1).min(frames);
                peak_of(&self.samples[a * ch..b * ch])
            })
            .collect()
    }
}

fn ms_to_frames(ms: Millis, sample_rate: u32) -> usize {
    let rate = sample_rate as u64;
    (ms.saturating_mul(rate).saturating_add(500) / 1000) as usize
}

/// `samples` as a buffer length, if within [`MAX_SAMPLES`]
fn checked_len(samples: u128) -> Result<usize, AudioError> {
    match usize::try_from(samples) {
        Ok(len) if len <= MAX_SAMPLES => Ok(len),
        _ => Err(AudioError::TooLarge {
            samples,
            limit: MAX_SAMPLES,
        }),
    }
}

fn buffer(len: usize) -> Result<Vec<f32>, AudioError> {
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(len)
        .map_err(|_| AudioError::TooLarge {
            samples: len as u128,
            limit: MAX_SAMPLES,
        })?;
    Ok(samples)
}

fn peak_of(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(ms: Millis) -> AudioSegment {
        // 1 kHz mono so one frame is one millisecond
        let samples = (0..ms).map(|i| (i % 10) as f32 / 10.0).collect();
        AudioSegment::new(1000, 1, samples).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_formats() {
        assert!(AudioSegment::new(0, 1, vec![]).is_err());
        assert!(AudioSegment::new(44100, 0, vec![]).is_err());
        assert!(AudioSegment::new(44100, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_silent_length_round_trips() {
        for ms in [0, 1, 7, 999, 1000, 12345] {
            assert_eq!(AudioSegment::silent(ms, 44100, 2).unwrap().len_ms(), ms);
        }
    }

    #[test]
    fn test_slice_clamps() {
        let seg = ramp(100);
        assert_eq!(seg.slice(10, 30).len_ms(), 20);
        assert_eq!(seg.slice(90, 500).len_ms(), 10);
        assert_eq!(seg.slice(50, 20).len_ms(), 0);
    }

    #[test]
    fn test_insert_silence() {
        let seg = ramp(100).insert_silence(50, 25).unwrap();
        assert_eq!(seg.len_ms(), 125);
        assert!(seg.samples()[50..75].iter().all(|s| *s == 0.0));
        assert_eq!(seg.samples()[75], ramp(100).samples()[50]);
    }

    #[test]
    fn test_replace_with_silence_keeps_length() {
        let seg = ramp(100).replace_with_silence(10, 20);
        assert_eq!(seg.len_ms(), 100);
        assert!(seg.samples()[10..30].iter().all(|s| *s == 0.0));
        assert_eq!(seg.samples()[31], 0.1);
    }

    #[test]
    fn test_fades() {
        let seg = AudioSegment::new(1000, 1, vec![1.0; 100]).unwrap();
        let faded = seg.fade_in(10);
        assert_eq!(faded.samples()[0], 0.0);
        assert!(faded.samples()[5] < 1.0);
        assert_eq!(faded.samples()[10], 1.0);

        let faded = seg.fade_out(10);
        assert_eq!(faded.samples()[89], 1.0);
        assert_eq!(faded.samples()[99], 0.0);
    }

    #[test]
    fn test_overlay_keeps_receiver_length_and_clips() {
        let long = AudioSegment::new(1000, 1, vec![0.75; 100]).unwrap();
        let short = AudioSegment::new(1000, 1, vec![0.5; 40]).unwrap();
        let mixed = long.overlay(&short).unwrap();
        assert_eq!(mixed.len_ms(), 100);
        assert_eq!(mixed.samples()[0], 1.0);
        assert_eq!(mixed.samples()[50], 0.75);
    }

    #[test]
    fn test_concat_conforms_format() {
        let stereo = AudioSegment::silent(100, 2000, 2).unwrap();
        let mono = AudioSegment::new(1000, 1, vec![0.5; 50]).unwrap();
        let joined = stereo.concat(&mono).unwrap();
        assert_eq!(joined.channels(), 2);
        assert_eq!(joined.sample_rate(), 2000);
        assert_eq!(joined.len_ms(), 150);
    }

    #[test]
    fn test_repeat() {
        assert_eq!(ramp(30).repeat(3).unwrap().len_ms(), 90);
        assert_eq!(ramp(30).repeat(0).unwrap().len_ms(), 0);
    }

    #[test]
    fn test_normalize_range() {
        let seg = AudioSegment::new(1000, 1, vec![0.25; 100]).unwrap();
        let out = seg.normalize_range(0, 50, 0.0).unwrap();
        assert!((out.samples()[0] - 1.0).abs() < 1e-6);
        assert_eq!(out.samples()[60], 0.25);

        let silent = AudioSegment::silent(10, 1000, 1).unwrap();
        assert_eq!(silent.normalize_range(0, 10, -3.0).unwrap(), silent);
    }

    #[test]
    fn test_peaks() {
        let peaks = ramp(100).peaks(10);
        assert_eq!(peaks.len(), 10);
        assert!(peaks.iter().all(|p| (*p - 0.9).abs() < 1e-6));
        assert_eq!(AudioSegment::silent(0, 1000, 1).unwrap().peaks(4), vec![0.0; 4]);
    }

    #[test]
    fn test_oversized_requests_are_errors() {
        assert!(matches!(
            AudioSegment::silent(u64::MAX, 44100, 2),
            Err(AudioError::TooLarge { .. })
        ));
        assert!(matches!(
            AudioSegment::silent(100_000_000_000, 44100, 1),
            Err(AudioError::TooLarge { .. })
        ));
        assert!(matches!(
            ramp(10).repeat(u64::MAX),
            Err(AudioError::TooLarge { .. })
        ));
        assert!(matches!(
            ramp(10).repeat(MAX_SAMPLES as u64),
            Err(AudioError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_repeat_of_empty_clip_is_empty() {
        let empty = AudioSegment::silent(0, 1000, 1).unwrap();
        assert!(empty.repeat(u64::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_rejects_unreachable_level() {
        let seg = AudioSegment::new(1000, 1, vec![0.25; 10]).unwrap();
        assert!(seg.normalize_range(0, 10, f64::INFINITY).is_err());
        assert!(seg.normalize_range(0, 10, f64::NAN).is_err());
        assert!(seg.normalize_range(0, 10, 1e6).is_err());
    }

    #[test]
    fn test_resample_keeps_duration_and_level() {
        // 100 Hz tone at 8 kHz, upsampled to 16 kHz
        let samples: Vec<f32> = (0..800)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 8000.0).sin())
            .collect();
        let tone = AudioSegment::new(8000, 1, samples).unwrap();
        let up = tone.conform(16000, 1).unwrap();
        assert_eq!(up.sample_rate(), 16000);
        assert_eq!(up.frames(), 1600);
        assert_eq!(up.len_ms(), 100);

        let mid = peak_of(&up.samples()[400..1200]);
        assert!((mid - 0.5).abs() < 0.05, "peak {mid}");
    }

    #[test]
    fn test_resample_down_and_stereo() {
        let seg = AudioSegment::new(2000, 2, vec![0.25; 400]).unwrap();
        let down = seg.conform(1000, 2).unwrap();
        assert_eq!(down.channels(), 2);
        assert_eq!(down.frames(), 100);
    }
}
