//! Background music rotation.
//!
//! A bed is built by walking a per-file shuffled order of the track pool,
//! appending whole tracks and wrapping around to the start of the same order
//! when it runs out, then cutting the last track at the exact target length.

use crate::{
    buffer::AudioBuffer,
    error::{ComposeError, Result},
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// A background track that has already been loudness-normalized
#[derive(Clone, Debug)]
pub struct NormalizedTrack {
    pub id: String,
    pub buffer: AudioBuffer,
}

/// Concatenated background music covering a target duration
#[derive(Clone, Debug)]
pub struct BgmBed {
    pub buffer: AudioBuffer,
    /// Identifiers of the tracks used, in play order (repeats included)
    pub tracks: Vec<String>,
}

/// Shuffled traversal order of `len` tracks, fixed by `seed`
pub fn rotation_order(len: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}

/// Builds a bed of exactly `target_frames` frames from `pool`.
///
/// The same `seed` always gives the same order. Loop boundaries only fall on
/// track boundaries; only the final track is cut short.
pub fn build_bed(pool: &[NormalizedTrack], target_frames: usize, seed: u64) -> Result<BgmBed> {
    let first = pool.first().ok_or(ComposeError::NoBgmAvailable)?;
    let format = first.buffer.format();

    for track in pool {
        track.buffer.expect_format(format, "bgm rotation")?;
    }

    let order: Vec<&NormalizedTrack> = rotation_order(pool.len(), seed)
        .into_iter()
        .map(|i| &pool[i])
        .filter(|track| {
            if track.buffer.is_empty() {
                warn!("Skipping empty BGM track {}", track.id);
            }
            !track.buffer.is_empty()
        })
        .collect();

    if order.is_empty() {
        return Err(ComposeError::NoBgmAvailable);
    }

    let mut parts = Vec::new();
    let mut tracks = Vec::new();
    let mut covered = 0usize;

    for track in order.iter().cycle() {
        if covered >= target_frames {
            break;
        }

        let take = (target_frames - covered).min(track.buffer.frames());
        if take == track.buffer.frames() {
            parts.push(track.buffer.clone());
        } else {
            parts.push(track.buffer.slice_frames(0, take));
        }

        tracks.push(track.id.clone());
        covered += take;
    }

    debug!(
        "Built BGM bed of {} frames from {} segment(s): {:?}",
        covered,
        tracks.len(),
        tracks
    );

    Ok(BgmBed {
        buffer: AudioBuffer::concat(format, &parts)?,
        tracks,
    })
}
