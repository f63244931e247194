//! Loudness measurement and normalization.
//!
//! Loudness here is the RMS level of all samples in dBFS (full scale = 1.0).
//! Normalization scales a buffer so that its RMS level matches a target. It is
//! kept apart from per-output gain: tracks are normalized once to the
//! reference level and any mix gain is applied afterwards.

use crate::{
    buffer::AudioBuffer,
    constants::{MAX_NORMALIZE_GAIN_DB, SILENCE_FLOOR_DBFS},
    error::{ComposeError, Result},
};
use std::sync::{Arc, OnceLock};

/// RMS level of `buffer` in dBFS. Exact silence (and an empty buffer) is `-inf`.
pub fn measure(buffer: &AudioBuffer) -> f64 {
    let samples = buffer.samples();
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }

    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();

    if rms == 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * rms.log10()
    }
}

/// Scales `buffer` so that `measure` of the result is `target_dbfs`.
///
/// Fails with [`ComposeError::DegenerateInput`] for exact silence. Near-silent
/// input gets at most [`MAX_NORMALIZE_GAIN_DB`] of gain so noise is not blown up.
pub fn normalize_to(buffer: &AudioBuffer, target_dbfs: f64) -> Result<AudioBuffer> {
    normalize_measured(buffer, measure(buffer), target_dbfs, "buffer")
}

/// Same as [`normalize_to`] with a loudness value measured beforehand
pub fn normalize_measured(
    buffer: &AudioBuffer,
    measured_dbfs: f64,
    target_dbfs: f64,
    label: &str,
) -> Result<AudioBuffer> {
    if measured_dbfs == f64::NEG_INFINITY {
        return Err(ComposeError::DegenerateInput(label.to_string()));
    }

    let wanted = target_dbfs - measured_dbfs;
    let gain = wanted.min(MAX_NORMALIZE_GAIN_DB);

    if gain < wanted {
        warn!(
            "{label} is near-silent ({measured_dbfs:.1} dBFS), clamping normalization gain to +{gain:.1} dB"
        );
    } else if measured_dbfs < SILENCE_FLOOR_DBFS {
        warn!("{label} is below the silence floor ({measured_dbfs:.1} dBFS)");
    }

    Ok(buffer.with_gain_db(gain))
}

/// Background track with its measured loudness cached after first use.
///
/// Clones share the cache, so it can be populated from any thread; a race only
/// means the (pure) measurement runs twice.
#[derive(Clone, Debug)]
pub struct BgmTrack {
    pub id: String,
    pub buffer: AudioBuffer,
    loudness: Arc<OnceLock<f64>>,
}

impl BgmTrack {
    pub fn new(id: impl Into<String>, buffer: AudioBuffer) -> Self {
        Self {
            id: id.into(),
            buffer,
            loudness: Arc::default(),
        }
    }

    /// RMS loudness in dBFS, measured on first call
    pub fn loudness(&self) -> f64 {
        *self.loudness.get_or_init(|| measure(&self.buffer))
    }

    pub fn is_loudness_cached(&self) -> bool {
        self.loudness.get().is_some()
    }

    /// Track normalized to `target_dbfs`.
    ///
    /// A silent track is logged and returned unchanged: it still fills its
    /// slot in the rotation, it just contributes no music.
    pub fn normalized(&self, target_dbfs: f64) -> AudioBuffer {
        match normalize_measured(&self.buffer, self.loudness(), target_dbfs, &self.id) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("{e}, using it without normalization");
                self.buffer.clone()
            }
        }
    }
}
