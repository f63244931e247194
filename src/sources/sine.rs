use crate::buffer::{AudioBuffer, AudioFormat};
use crate::constants::{CHANNELS, SAMPLE_RATE};
use std::time::Duration;

pub const OUTPUT_FORMAT: AudioFormat = AudioFormat {
    sample_rate: SAMPLE_RATE,
    channels: CHANNELS,
};

/// Sine tone of frequency `f` in the output format
pub fn tone(f: f64, duration: Duration, amplitude: f64) -> AudioBuffer {
    tone_with_format(f, duration, amplitude, OUTPUT_FORMAT)
}

pub fn tone_with_format(
    f: f64,
    duration: Duration,
    amplitude: f64,
    format: AudioFormat,
) -> AudioBuffer {
    let frames = (duration.as_secs_f64() * format.sample_rate as f64).round() as usize;
    let channels = format.channels as usize;
    let mut samples = Vec::with_capacity(frames * channels);

    // Initialize a phase variable to keep track of the sine wave phase
    let mut phase = 0.0;

    for _ in 0..frames {
        let sample = sine_wave(phase, amplitude);
        samples.extend(std::iter::repeat(sample).take(channels));

        // Increment the phase by the frequency divided by the sample rate
        phase += f / format.sample_rate as f64;

        // Wrap the phase around 1.0 to avoid precision loss
        phase %= 1.0;
    }

    AudioBuffer::new(samples, format.sample_rate, format.channels)
}

/// Silence in the output format
pub fn silence(duration: Duration) -> AudioBuffer {
    let frames = (duration.as_secs_f64() * SAMPLE_RATE as f64).round() as usize;
    AudioBuffer::silence(frames, OUTPUT_FORMAT)
}

// Sine wave sample given a phase in [0, 1)
fn sine_wave(phase: f64, amplitude: f64) -> f32 {
    ((phase * std::f64::consts::PI * 2.0).sin() * amplitude) as f32
}
