use crate::{
    buffer::{db_to_linear, frames_for_ms, AudioBuffer},
    constants::{
        DEFAULT_BGM_FADE_IN_MS, DEFAULT_BGM_FADE_OUT_MS, DEFAULT_BGM_GAIN_DB,
        DEFAULT_BGM_INTRO_MS, DEFAULT_BGM_TAIL_MS, DEFAULT_SPEECH_GAIN_DB,
    },
    error::Result,
    limiter::PeakLimiter,
};
use serde::{Deserialize, Serialize};

/// How speech and background music are combined for one output file
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MixSpec {
    pub bgm_enabled: bool,
    pub speech_gain_db: f64,
    pub bgm_gain_db: f64,
    /// Music before speech starts
    pub bgm_intro_ms: u64,
    /// Music after speech ends
    pub bgm_tail_ms: u64,
    pub bgm_fade_in_ms: u64,
    pub bgm_fade_out_ms: u64,
    /// Restrict the rotation to this track id, if present in the pool
    pub bgm_track: Option<String>,
}

impl Default for MixSpec {
    fn default() -> Self {
        MixSpec {
            bgm_enabled: false,
            speech_gain_db: DEFAULT_SPEECH_GAIN_DB,
            bgm_gain_db: DEFAULT_BGM_GAIN_DB,
            bgm_intro_ms: DEFAULT_BGM_INTRO_MS,
            bgm_tail_ms: DEFAULT_BGM_TAIL_MS,
            bgm_fade_in_ms: DEFAULT_BGM_FADE_IN_MS,
            bgm_fade_out_ms: DEFAULT_BGM_FADE_OUT_MS,
            bgm_track: None,
        }
    }
}

impl MixSpec {
    pub fn intro_frames(&self, sample_rate: u32) -> usize {
        frames_for_ms(sample_rate, self.bgm_intro_ms)
    }

    pub fn tail_frames(&self, sample_rate: u32) -> usize {
        frames_for_ms(sample_rate, self.bgm_tail_ms)
    }

    /// Bed length needed under `speech_frames` of speech: intro + speech + tail
    pub fn bed_frames(&self, speech_frames: usize, sample_rate: u32) -> usize {
        self.intro_frames(sample_rate)
            .saturating_add(speech_frames)
            .saturating_add(self.tail_frames(sample_rate))
    }
}

/// No-BGM path: speech with its gain applied, limited if the gain pushed it past full scale.
///
/// The gain is exact only while the boosted peak stays under [`crate::limiter::CEILING`]; louder
/// recordings come out quieter than `speech_gain_db` asks for.
pub fn apply_speech_gain(speech: &AudioBuffer, spec: &MixSpec) -> AudioBuffer {
    if spec.speech_gain_db == 0.0 {
        return speech.clone();
    }

    let boosted = speech.with_gain_db(spec.speech_gain_db);
    PeakLimiter::new(boosted.sample_rate()).process(&boosted)
}

/// Lays `speech` over `bed`, starting `bgm_intro_ms` into the bed.
///
/// The output is intro + speech + tail long. With `bgm_enabled` unset the bed
/// is ignored and this is [`apply_speech_gain`].
pub fn mix(speech: &AudioBuffer, bed: &AudioBuffer, spec: &MixSpec) -> Result<AudioBuffer> {
    if !spec.bgm_enabled {
        return Ok(apply_speech_gain(speech, spec));
    }

    let format = speech.format();
    bed.expect_format(format, "mixing")?;

    let channels = format.channels as usize;
    let intro = spec.intro_frames(format.sample_rate);
    let total = spec.bed_frames(speech.frames(), format.sample_rate);

    let bed_gain = db_to_linear(spec.bgm_gain_db);
    let speech_gain = db_to_linear(spec.speech_gain_db);
    let fade_in = frames_for_ms(format.sample_rate, spec.bgm_fade_in_ms).min(total);
    let fade_out = frames_for_ms(format.sample_rate, spec.bgm_fade_out_ms).min(total);

    let mut out = vec![0.0f32; total * channels];

    for (i, frame) in bed.samples().chunks_exact(channels).take(total).enumerate() {
        let gain = bed_gain * fade_envelope(i, total, fade_in, fade_out);
        for (c, &s) in frame.iter().enumerate() {
            out[i * channels + c] = s * gain;
        }
    }

    let offset = intro * channels;
    for (i, &s) in speech.samples().iter().enumerate() {
        out[offset + i] += s * speech_gain;
    }

    let mixed = AudioBuffer::new(out, format.sample_rate, format.channels);
    Ok(PeakLimiter::new(format.sample_rate).process(&mixed))
}

/// Linear fade-in from the first frame and fade-out to the last frame
fn fade_envelope(frame: usize, total: usize, fade_in: usize, fade_out: usize) -> f32 {
    let mut gain = 1.0f32;

    if frame < fade_in {
        gain *= frame as f32 / fade_in as f32;
    }

    let remaining = total - frame;
    if remaining <= fade_out {
        gain *= (remaining - 1) as f32 / fade_out as f32;
    }

    gain
}
