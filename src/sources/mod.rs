//! Audio providers consumed by the composer.
//!
//! Chapter speech and background music come from providers behind traits so
//! the composer never touches the file system. Providers hand out buffers in
//! the output format (see [`crate::constants`]).

pub mod bgm;
pub mod chapters;
pub mod memory;
pub mod sine;
pub mod symphonia;

use crate::{buffer::AudioBuffer, error::Result, loudness::BgmTrack, plan::ChapterRef};

/// Resolves a chapter reference to decoded speech.
pub trait ChapterProvider: Send + Sync {
    /// Returns [`crate::error::ComposeError::MissingChapter`] when the chapter has no audio.
    fn get_chapter(&self, chapter: &ChapterRef) -> Result<AudioBuffer>;
}

/// Supplies the candidate background tracks. The set may be empty.
pub trait BgmPool: Send + Sync {
    fn list_tracks(&self) -> Vec<BgmTrack>;
}
