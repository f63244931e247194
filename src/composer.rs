//! Daily audio composition.
//!
//! A [`Composer`] turns one day's [`SpeechPlan`] into a finished buffer:
//! chapters are fetched and joined in reading order, optionally sped up, and
//! optionally laid over a rotated, loudness-normalized music bed.
//!
//! Every `compose` call is independent. The only state shared between calls
//! is the cache of normalized background tracks, which is filled idempotently,
//! so days can be composed in parallel from several threads.

use crate::{
    buffer::{frames_for_ms, AudioBuffer},
    constants::{DEFAULT_CHAPTER_GAP_MS, DEFAULT_TARGET_DBFS},
    error::{ComposeError, Result},
    loudness::BgmTrack,
    mixer::{self, MixSpec},
    plan::{ChapterRef, SpeechPlan},
    rotation::{self, NormalizedTrack},
    sources::{BgmPool, ChapterProvider},
    tempo,
};
use rand::Rng;
use serde::Serialize;
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    sync::{Arc, PoisonError, RwLock},
};

/// Marks which variant of a day an output file is, so both can coexist
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FilenameSuffix {
    Plain,
    Bgm,
}

impl FilenameSuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilenameSuffix::Plain => "",
            FilenameSuffix::Bgm => "-bgm",
        }
    }
}

impl Display for FilenameSuffix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a chapter sits in the joined speech, before any tempo change
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpeechSegment {
    pub chapter: ChapterRef,
    pub start_frame: usize,
    pub frames: usize,
}

/// Background music actually used for a composition
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BgmReport {
    pub seed: u64,
    pub tracks: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Composition {
    pub buffer: AudioBuffer,
    pub suffix: FilenameSuffix,
    pub segments: Vec<SpeechSegment>,
    pub bgm: Option<BgmReport>,
}

pub struct Composer {
    chapters: Arc<dyn ChapterProvider>,
    bgm_pool: Arc<dyn BgmPool>,
    target_dbfs: f64,
    chapter_gap_ms: u64,
    normalized: RwLock<HashMap<String, AudioBuffer>>,
}

impl Composer {
    pub fn new(chapters: Arc<dyn ChapterProvider>, bgm_pool: Arc<dyn BgmPool>) -> Self {
        Self {
            chapters,
            bgm_pool,
            target_dbfs: DEFAULT_TARGET_DBFS,
            chapter_gap_ms: DEFAULT_CHAPTER_GAP_MS,
            normalized: RwLock::default(),
        }
    }

    /// Reference level background tracks are normalized to
    pub fn with_target_dbfs(mut self, target_dbfs: f64) -> Self {
        self.target_dbfs = target_dbfs;
        self
    }

    /// Silence inserted between consecutive chapters
    pub fn with_chapter_gap_ms(mut self, gap_ms: u64) -> Self {
        self.chapter_gap_ms = gap_ms;
        self
    }

    /// Composes one output file. A fresh rotation seed is drawn only when BGM is enabled.
    pub fn compose(
        &self,
        plan: &SpeechPlan,
        speed_ratio: f64,
        spec: &MixSpec,
    ) -> Result<Composition> {
        let seed = spec.bgm_enabled.then(|| rand::rng().random::<u64>());
        self.compose_inner(plan, speed_ratio, spec, seed)
    }

    /// Like [`Composer::compose`] with a fixed rotation seed
    pub fn compose_with_seed(
        &self,
        plan: &SpeechPlan,
        speed_ratio: f64,
        spec: &MixSpec,
        seed: u64,
    ) -> Result<Composition> {
        self.compose_inner(plan, speed_ratio, spec, Some(seed))
    }

    fn compose_inner(
        &self,
        plan: &SpeechPlan,
        speed_ratio: f64,
        spec: &MixSpec,
        seed: Option<u64>,
    ) -> Result<Composition> {
        if !speed_ratio.is_finite() || speed_ratio <= 0.0 {
            return Err(ComposeError::InvalidRatio(speed_ratio));
        }

        let (speech, segments) = self.join_speech(plan)?;

        let speech = if speed_ratio != 1.0 {
            tempo::stretch(&speech, speed_ratio)?
        } else {
            speech
        };

        if !spec.bgm_enabled {
            info!(
                "Composed {} ({:.1}s, no BGM)",
                plan.describe(),
                speech.duration().as_secs_f64()
            );

            return Ok(Composition {
                buffer: mixer::apply_speech_gain(&speech, spec),
                suffix: FilenameSuffix::Plain,
                segments,
                bgm: None,
            });
        }

        let tracks = self.bgm_pool.list_tracks();
        if tracks.is_empty() {
            return Err(ComposeError::NoBgmAvailable);
        }

        let pool: Vec<NormalizedTrack> = select_tracks(tracks, spec.bgm_track.as_deref())
            .iter()
            .map(|track| self.normalized_track(track))
            .collect();

        let seed = seed.unwrap_or_default();
        let bed_frames = spec.bed_frames(speech.frames(), speech.sample_rate());
        let bed = rotation::build_bed(&pool, bed_frames, seed)?;
        let buffer = mixer::mix(&speech, &bed.buffer, spec)?;

        info!(
            "Composed {} ({:.1}s) with BGM {:?}",
            plan.describe(),
            buffer.duration().as_secs_f64(),
            bed.tracks
        );

        Ok(Composition {
            buffer,
            suffix: FilenameSuffix::Bgm,
            segments,
            bgm: Some(BgmReport {
                seed,
                tracks: bed.tracks,
            }),
        })
    }

    /// Fetches every chapter and joins them in plan order. Any missing chapter fails the whole day.
    fn join_speech(&self, plan: &SpeechPlan) -> Result<(AudioBuffer, Vec<SpeechSegment>)> {
        let mut parts = Vec::with_capacity(plan.len() * 2);
        let mut segments = Vec::with_capacity(plan.len());
        let mut format = None;
        let mut position = 0usize;

        for chapter in plan {
            let buffer = self.chapters.get_chapter(chapter)?;
            let first_format = *format.get_or_insert(buffer.format());

            if !parts.is_empty() && self.chapter_gap_ms > 0 {
                let gap = AudioBuffer::silence(
                    frames_for_ms(first_format.sample_rate, self.chapter_gap_ms),
                    first_format,
                );
                position += gap.frames();
                parts.push(gap);
            }

            segments.push(SpeechSegment {
                chapter: *chapter,
                start_frame: position,
                frames: buffer.frames(),
            });
            position += buffer.frames();
            parts.push(buffer);
        }

        let format = format.ok_or(ComposeError::EmptyPlan)?;
        Ok((AudioBuffer::concat(format, &parts)?, segments))
    }

    /// Normalized copy of `track`, computed once per track id
    fn normalized_track(&self, track: &BgmTrack) -> NormalizedTrack {
        let cached = self
            .normalized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&track.id)
            .cloned();

        let buffer = match cached {
            Some(buffer) => buffer,
            None => {
                let buffer = track.normalized(self.target_dbfs);
                self.normalized
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(track.id.clone())
                    .or_insert(buffer)
                    .clone()
            }
        };

        NormalizedTrack {
            id: track.id.clone(),
            buffer,
        }
    }

    /// Number of tracks currently held in the normalized cache
    pub fn cached_tracks(&self) -> usize {
        self.normalized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Narrows the pool to `wanted` if it is present, otherwise keeps the full rotation
fn select_tracks(tracks: Vec<BgmTrack>, wanted: Option<&str>) -> Vec<BgmTrack> {
    let Some(wanted) = wanted else {
        return tracks;
    };

    match tracks.iter().find(|track| track.id == wanted) {
        Some(track) => vec![track.clone()],
        None => {
            warn!("BGM track {wanted} not found in pool, falling back to rotation");
            tracks
        }
    }
}
