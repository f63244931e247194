//! Immutable decoded audio.
//!
//! Samples are interleaved `f32` in `[-1.0, 1.0]` behind an `Arc`, so clones are
//! cheap and every transformation produces a new buffer instead of mutating.

use crate::error::{ComposeError, Result};
use std::{fmt, sync::Arc, time::Duration};

/// Sample rate and channel count of a buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

/// Number of frames covering `ms` milliseconds at `sample_rate`, saturating on overflow
pub fn frames_for_ms(sample_rate: u32, ms: u64) -> usize {
    let frames = u64::from(sample_rate).saturating_mul(ms) / 1000;
    usize::try_from(frames).unwrap_or(usize::MAX)
}

pub fn db_to_linear(db: f64) -> f32 {
    10f64.powf(db / 20.0) as f32
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    format: AudioFormat,
}

impl AudioBuffer {
    /// Wraps interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);

        Self {
            samples: samples.into(),
            format: AudioFormat {
                sample_rate,
                channels,
            },
        }
    }

    pub fn silence(frames: usize, format: AudioFormat) -> Self {
        Self::new(
            vec![0.0; frames * format.channels as usize],
            format.sample_rate,
            format.channels,
        )
    }

    pub fn empty(format: AudioFormat) -> Self {
        Self::silence(0, format)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.format.sample_rate as f64)
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Average of all channels per frame
    pub fn downmix_mono(&self) -> Vec<f32> {
        let channels = self.format.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Frames `start..end`, clamped to the buffer
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioBuffer {
        let channels = self.format.channels as usize;
        let end = end.min(self.frames());
        let start = start.min(end);

        AudioBuffer::new(
            self.samples[start * channels..end * channels].to_vec(),
            self.format.sample_rate,
            self.format.channels,
        )
    }

    /// Scales every sample by `gain_db`. A gain of exactly 0 dB returns a clone.
    pub fn with_gain_db(&self, gain_db: f64) -> AudioBuffer {
        if gain_db == 0.0 {
            return self.clone();
        }

        let gain = db_to_linear(gain_db);
        self.map_samples(|s| s * gain)
    }

    pub fn map_samples<F: Fn(f32) -> f32>(&self, f: F) -> AudioBuffer {
        AudioBuffer::new(
            self.samples.iter().map(|&s| f(s)).collect(),
            self.format.sample_rate,
            self.format.channels,
        )
    }

    /// Joins buffers end to end. All parts must share `format`.
    pub fn concat(format: AudioFormat, parts: &[AudioBuffer]) -> Result<AudioBuffer> {
        let total: usize = parts.iter().map(|p| p.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);

        for part in parts {
            part.expect_format(format, "concatenation")?;
            samples.extend_from_slice(&part.samples);
        }

        Ok(AudioBuffer::new(samples, format.sample_rate, format.channels))
    }

    pub fn expect_format(&self, expected: AudioFormat, stage: &'static str) -> Result<()> {
        if self.format != expected {
            return Err(ComposeError::FormatMismatch {
                stage,
                expected,
                found: self.format,
            });
        }
        Ok(())
    }
}
