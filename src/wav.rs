use crate::{buffer::AudioBuffer, constants::BIT_DEPTH};
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Writes `buffer` as 16-bit PCM WAV
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: BIT_DEPTH,
        sample_format: SampleFormat::Int,
    };

    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("Could not create {path:?}"))?;

    for &sample in buffer.samples() {
        writer.write_sample(to_i16(sample))?;
    }

    writer
        .finalize()
        .with_context(|| format!("Could not finalize {path:?}"))?;

    Ok(())
}

/// Float sample to 16-bit, clamping anything outside full scale
pub fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
