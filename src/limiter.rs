//! Peak limiter for the final mix
//!
//! Keeps summed speech and music under full scale. Attack is immediate, so no
//! frame ever exceeds the ceiling; gain then holds briefly and recovers smoothly.

use crate::buffer::AudioBuffer;

/// Ceiling in linear scale (just under 0 dBFS so 16-bit export never wraps)
pub const CEILING: f32 = 0.999;

pub struct PeakLimiter {
    ceiling: f32,
    release_samples: usize,
    hold_samples: usize,
}

impl PeakLimiter {
    /// 100ms release, 10ms hold
    pub fn new(sample_rate: u32) -> Self {
        Self {
            ceiling: CEILING,
            release_samples: ((sample_rate as f32 * 0.1) as usize).max(1),
            hold_samples: (sample_rate as f32 * 0.01) as usize,
        }
    }

    pub fn with_ceiling(mut self, ceiling: f32) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Returns `buffer` untouched when its peak is already under the ceiling
    pub fn process(&self, buffer: &AudioBuffer) -> AudioBuffer {
        if buffer.peak() <= self.ceiling {
            return buffer.clone();
        }

        let channels = buffer.channels() as usize;
        let release_coeff = 1.0 / self.release_samples as f32;
        let mut gain = 1.0f32;
        let mut hold = 0usize;
        let mut limited_frames = 0usize;

        let mut samples = buffer.samples().to_vec();
        for frame in samples.chunks_exact_mut(channels) {
            let frame_peak = frame.iter().fold(0.0f32, |p, s| p.max(s.abs()));

            let target = if frame_peak > self.ceiling {
                self.ceiling / frame_peak
            } else {
                1.0
            };

            if target < gain {
                gain = target;
                hold = self.hold_samples;
            } else if hold > 0 {
                hold -= 1;
            } else {
                gain += (1.0 - gain) * release_coeff;
                if gain > 0.9999 {
                    gain = 1.0;
                }
                gain = gain.min(target);
            }

            if gain < 1.0 {
                limited_frames += 1;
                frame.iter_mut().for_each(|s| *s *= gain);
            }
        }

        debug!(
            "Limiter reduced gain on {limited_frames} of {} frames",
            buffer.frames()
        );

        AudioBuffer::new(samples, buffer.sample_rate(), buffer.channels())
    }
}
