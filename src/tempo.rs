//! Tempo adjustment without pitch change.
//!
//! Waveform-similarity overlap-add (WSOLA): the input is cut into Hann-windowed
//! grains that are laid out at a fixed synthesis hop, while the analysis hop is
//! scaled by the ratio. Each grain's source position is nudged within a small
//! tolerance so that it lines up with the natural continuation of the previous
//! grain, which keeps periodic content (voiced speech) phase-coherent and the
//! pitch intact. Resampling is never used here since it would shift pitch.

use crate::{
    buffer::{frames_for_ms, AudioBuffer},
    error::{ComposeError, Result},
};

/// Grain length
const WINDOW_MS: u64 = 40;
/// Maximum distance a grain may be moved from its nominal position
const SEEK_MS: u64 = 10;
/// Sample stride used by the coarse correlation search
const COARSE_STRIDE: usize = 4;
/// Window sums below this are left unnormalized (only at the very first samples)
const NORM_EPSILON: f32 = 1e-3;

/// Time-stretches `buffer` so that its duration becomes `duration / ratio`.
///
/// `ratio = 2.0` halves the duration. Output has the same sample rate and
/// channel count as the input. The result is a pure function of the input.
pub fn stretch(buffer: &AudioBuffer, ratio: f64) -> Result<AudioBuffer> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ComposeError::InvalidRatio(ratio));
    }

    if ratio == 1.0 || buffer.is_empty() {
        return Ok(buffer.clone());
    }

    let rate = buffer.sample_rate();
    let channels = buffer.channels() as usize;
    let window = (frames_for_ms(rate, WINDOW_MS).max(8) / 2) * 2;
    let hop_out = window / 2;
    let hop_in = hop_out as f64 * ratio;
    let tolerance = frames_for_ms(rate, SEEK_MS).max(1) as isize;

    let in_frames = buffer.frames();
    let out_frames = (in_frames as f64 / ratio).round() as usize;

    let mono = buffer.downmix_mono();
    let input = buffer.samples();
    let hann = hann_window(window);

    let mut output = vec![0.0f32; (out_frames + window) * channels];
    let mut norm = vec![0.0f32; out_frames + window];
    let mut prev_src: isize = 0;
    let mut grain = 0usize;

    loop {
        let out_pos = grain * hop_out;
        if out_pos >= out_frames {
            break;
        }

        let src = if grain == 0 {
            0
        } else {
            let nominal = (grain as f64 * hop_in).round() as isize;
            let natural = prev_src + hop_out as isize;
            best_alignment(&mono, natural, nominal, tolerance, hop_out)
        };

        for (n, &w) in hann.iter().enumerate() {
            norm[out_pos + n] += w;

            let src_frame = src + n as isize;
            if src_frame < 0 || src_frame as usize >= in_frames {
                continue;
            }

            let src_base = src_frame as usize * channels;
            let out_base = (out_pos + n) * channels;
            for c in 0..channels {
                output[out_base + c] += w * input[src_base + c];
            }
        }

        prev_src = src;
        grain += 1;
    }

    output.truncate(out_frames * channels);
    for (frame, &sum) in output.chunks_exact_mut(channels).zip(&norm) {
        if sum > NORM_EPSILON {
            frame.iter_mut().for_each(|s| *s /= sum);
        }
    }

    Ok(AudioBuffer::new(output, rate, buffer.channels()))
}

/// Periodic Hann window; overlapping copies at half-window hop sum to one
fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Picks the source position in `nominal ± tolerance` whose first `overlap`
/// frames best match the frames starting at `natural`.
fn best_alignment(
    mono: &[f32],
    natural: isize,
    nominal: isize,
    tolerance: isize,
    overlap: usize,
) -> isize {
    let lo = (nominal - tolerance).max(0);
    let hi = (nominal + tolerance).max(lo);

    // Coarse pass on a decimated grid, then refine around the winner
    let mut best = lo;
    let mut best_score = f32::MIN;
    let mut candidate = lo;
    while candidate <= hi {
        let score = similarity(mono, natural, candidate, overlap, COARSE_STRIDE);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
        candidate += COARSE_STRIDE as isize;
    }

    let fine_lo = (best - COARSE_STRIDE as isize).max(lo);
    let fine_hi = (best + COARSE_STRIDE as isize).min(hi);
    best_score = f32::MIN;
    for candidate in fine_lo..=fine_hi {
        let score = similarity(mono, natural, candidate, overlap, 1);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }

    best
}

/// Cross-correlation of two stretches of `mono`, normalized by the candidate's energy
fn similarity(mono: &[f32], reference: isize, candidate: isize, len: usize, stride: usize) -> f32 {
    let at = |i: isize| -> f32 {
        if i < 0 {
            0.0
        } else {
            mono.get(i as usize).copied().unwrap_or(0.0)
        }
    };

    let mut cross = 0.0f32;
    let mut energy = 0.0f32;
    for n in (0..len).step_by(stride) {
        let a = at(reference + n as isize);
        let b = at(candidate + n as isize);
        cross += a * b;
        energy += b * b;
    }

    if energy <= f32::EPSILON {
        return 0.0;
    }

    cross / energy.sqrt()
}
