//! Decoding audio files with symphonia and converting them to the output format.

use crate::{
    buffer::AudioBuffer,
    constants::{CHANNELS, SAMPLE_RATE},
    error::{ComposeError, Result},
};
use anyhow::Context;
use rubato::{FftFixedIn, Resampler};
use std::{fs::File, path::Path};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Decodes `path` and converts it to [`SAMPLE_RATE`] / [`CHANNELS`]
pub fn load_file(path: &Path) -> Result<AudioBuffer> {
    decode_file(path)
        .and_then(|decoded| to_output_format(&decoded))
        .map_err(|e| ComposeError::Decode {
            path: path.display().to_string(),
            reason: format!("{e:#}"),
        })
}

/// Decodes the default track of `path` in its native sample rate and channel layout
pub fn decode_file(path: &Path) -> anyhow::Result<AudioBuffer> {
    let file = Box::new(File::open(path).with_context(|| format!("Could not open {path:?}"))?);
    let mss = MediaSourceStream::new(file, Default::default());

    // Let symphonia use the file extension as a hint
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();
    let decoder_opts: DecoderOptions = Default::default();

    let probed =
        symphonia::default::get_probe().format(&hint, mss, &format_opts, &metadata_opts)?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .context("Could not find any tracks in file")?;

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &decoder_opts)?;
    let track_id = track.id;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // Symphonia reports the end of stream as UnexpectedEof
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet in {path:?}: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if sample_buf.is_none() {
            let spec = *audio_buf.spec();
            sample_rate = Some(spec.rate);
            channels = Some(spec.channels.count() as u16);

            // Capacity, not length
            let duration = audio_buf.capacity() as u64;
            sample_buf = Some(SampleBuffer::<f32>::new(duration, spec));
        }

        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(audio_buf);
            samples.extend_from_slice(buf.samples());
        }
    }

    let sample_rate = sample_rate.context("Unknown sample rate")?;
    let channels = channels.context("Unknown channel layout")?;

    debug!(
        "Decoded {path:?}: {} frames at {sample_rate} Hz, {channels} ch",
        samples.len() / channels.max(1) as usize
    );

    Ok(AudioBuffer::new(samples, sample_rate, channels))
}

/// Converts a buffer to the output channel count and sample rate
pub fn to_output_format(buffer: &AudioBuffer) -> anyhow::Result<AudioBuffer> {
    let remapped = remap_channels(buffer, CHANNELS);
    resample(&remapped, SAMPLE_RATE)
}

/// Mono is duplicated to every channel; anything else is downmixed first
pub fn remap_channels(buffer: &AudioBuffer, channels: u16) -> AudioBuffer {
    if buffer.channels() == channels {
        return buffer.clone();
    }

    let mono = if buffer.channels() == 1 {
        buffer.samples().to_vec()
    } else {
        buffer.downmix_mono()
    };

    let samples = mono
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
        .collect();

    AudioBuffer::new(samples, buffer.sample_rate(), channels)
}

/// Resamples with an FFT resampler, compensating for its delay so the output
/// is aligned with the input and exactly `frames * target / source` long.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> anyhow::Result<AudioBuffer> {
    if buffer.sample_rate() == target_rate || buffer.is_empty() {
        return Ok(AudioBuffer::new(
            buffer.samples().to_vec(),
            target_rate,
            buffer.channels(),
        ));
    }

    let channels = buffer.channels() as usize;
    let frames = buffer.frames();

    let mut resampler = FftFixedIn::<f64>::new(
        buffer.sample_rate() as usize,
        target_rate as usize,
        RESAMPLER_CHUNK_SIZE,
        2, // sub-chunks
        channels,
    )
    .context("Failed to create resampler")?;

    // Deinterleave into one Vec per channel
    let mut planar: Vec<Vec<f64>> = vec![Vec::with_capacity(frames); channels];
    for frame in buffer.samples().chunks_exact(channels) {
        for (c, &s) in frame.iter().enumerate() {
            planar[c].push(s as f64);
        }
    }

    let expected = (frames as u64 * target_rate as u64 / buffer.sample_rate() as u64) as usize;
    let delay = resampler.output_delay();
    let chunk_size = resampler.input_frames_max();

    let mut output: Vec<Vec<f64>> = vec![Vec::new(); channels];
    let mut position = 0;

    while output[0].len() < expected + delay {
        // Pad the last chunks with silence
        let chunk: Vec<Vec<f64>> = planar
            .iter()
            .map(|ch| {
                let start = position.min(ch.len());
                let end = (position + chunk_size).min(ch.len());
                let mut chunk = ch[start..end].to_vec();
                chunk.resize(chunk_size, 0.0);
                chunk
            })
            .collect();

        let resampled = resampler
            .process(&chunk, None)
            .context("Resampling failed")?;

        for (out, ch) in output.iter_mut().zip(resampled) {
            out.extend(ch);
        }
        position += chunk_size;
    }

    let mut samples = Vec::with_capacity(expected * channels);
    for i in delay..delay + expected {
        for ch in &output {
            samples.push(ch[i] as f32);
        }
    }

    Ok(AudioBuffer::new(samples, target_rate, buffer.channels()))
}
