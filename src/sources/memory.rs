//! In-memory providers, for callers that already hold decoded audio.

use crate::{
    buffer::AudioBuffer,
    error::{ComposeError, Result},
    loudness::BgmTrack,
    plan::ChapterRef,
    sources::{BgmPool, ChapterProvider},
};
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct MemoryChapters {
    chapters: HashMap<ChapterRef, AudioBuffer>,
}

impl MemoryChapters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chapter: ChapterRef, buffer: AudioBuffer) {
        self.chapters.insert(chapter, buffer);
    }

    pub fn with(mut self, chapter: ChapterRef, buffer: AudioBuffer) -> Self {
        self.insert(chapter, buffer);
        self
    }
}

impl ChapterProvider for MemoryChapters {
    fn get_chapter(&self, chapter: &ChapterRef) -> Result<AudioBuffer> {
        self.chapters
            .get(chapter)
            .cloned()
            .ok_or(ComposeError::MissingChapter(*chapter))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBgmPool {
    tracks: Vec<BgmTrack>,
}

impl MemoryBgmPool {
    pub fn new(tracks: Vec<BgmTrack>) -> Self {
        Self { tracks }
    }
}

impl BgmPool for MemoryBgmPool {
    fn list_tracks(&self) -> Vec<BgmTrack> {
        self.tracks.clone()
    }
}
