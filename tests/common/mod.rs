//! Test infrastructure for plan-audio integration tests.
//!
//! Writes small chapter and BGM fixtures to temporary directories so the
//! composer can be driven through the same file providers the binary uses.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub use plan_audio::buffer::{AudioBuffer, AudioFormat};
pub use plan_audio::composer::{Composer, FilenameSuffix};
pub use plan_audio::error::ComposeError;
pub use plan_audio::mixer::MixSpec;
pub use plan_audio::plan::{ChapterRef, SpeechPlan};
pub use plan_audio::sources::bgm::BgmDir;
pub use plan_audio::sources::chapters::ChapterDir;
pub use plan_audio::sources::sine::{tone, tone_with_format, OUTPUT_FORMAT};
pub use plan_audio::wav::write_wav;

/// Output frames per second
pub const RATE: usize = 44100;

/// Chapter and BGM directories inside one temporary root
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("chapters")).unwrap();
        std::fs::create_dir(root.path().join("bgm")).unwrap();
        Self { root }
    }

    pub fn chapters_dir(&self) -> PathBuf {
        self.root.path().join("chapters")
    }

    pub fn bgm_dir(&self) -> PathBuf {
        self.root.path().join("bgm")
    }

    /// Writes `BBB_CCC.wav` holding a tone in the output format
    pub fn add_chapter(&self, book: u32, chapter: u32, millis: u64) -> PathBuf {
        let chapter = ChapterRef::new(book, chapter).unwrap();
        let path = self
            .chapters_dir()
            .join(format!("{}.wav", chapter.file_stem()));
        write_tone(&path, 200.0 + 10.0 * book as f64, millis, OUTPUT_FORMAT);
        path
    }

    /// Writes a chapter recorded at another rate or channel count
    pub fn add_chapter_with_format(
        &self,
        book: u32,
        chapter: u32,
        millis: u64,
        format: AudioFormat,
    ) -> PathBuf {
        let chapter = ChapterRef::new(book, chapter).unwrap();
        let path = self
            .chapters_dir()
            .join(format!("{}.wav", chapter.file_stem()));
        write_tone(&path, 250.0, millis, format);
        path
    }

    pub fn add_bgm(&self, name: &str, millis: u64, amplitude: f64) -> PathBuf {
        let path = self.bgm_dir().join(name);
        let buffer = tone(440.0, Duration::from_millis(millis), amplitude);
        write_wav(&path, &buffer).unwrap();
        path
    }

    /// Writes bytes that no decoder accepts
    pub fn add_garbage(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"definitely not audio").unwrap();
        path
    }

    pub fn composer(&self) -> Composer {
        let bgm = BgmDir::load(&self.bgm_dir()).unwrap();
        Composer::new(Arc::new(ChapterDir::new(self.chapters_dir())), Arc::new(bgm))
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_tone(path: &Path, frequency: f64, millis: u64, format: AudioFormat) {
    let buffer = tone_with_format(frequency, Duration::from_millis(millis), 0.3, format);
    write_wav(path, &buffer).unwrap();
}

pub fn ch(book: u32, chapter: u32) -> ChapterRef {
    ChapterRef::new(book, chapter).unwrap()
}

pub fn bgm_spec() -> MixSpec {
    MixSpec {
        bgm_enabled: true,
        ..MixSpec::default()
    }
}
