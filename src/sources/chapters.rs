use crate::{
    buffer::AudioBuffer,
    constants::AUDIO_EXTENSIONS,
    error::{ComposeError, Result},
    plan::ChapterRef,
    sources::{symphonia::load_file, ChapterProvider},
};
use std::path::{Path, PathBuf};

/// Chapter recordings stored as `BBB_CCC.<ext>` in one directory,
/// e.g. `043_016.mp3` for John 16
#[derive(Clone, Debug)]
pub struct ChapterDir {
    dir: PathBuf,
}

impl ChapterDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First existing file for `chapter`, trying extensions in preference order
    pub fn find(&self, chapter: &ChapterRef) -> Option<PathBuf> {
        let stem = chapter.file_stem();
        AUDIO_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())
    }
}

impl ChapterProvider for ChapterDir {
    fn get_chapter(&self, chapter: &ChapterRef) -> Result<AudioBuffer> {
        let path = self.find(chapter).ok_or_else(|| {
            warn!("Missing audio for {chapter} in {:?}", self.dir);
            ComposeError::MissingChapter(*chapter)
        })?;

        debug!("Loading {chapter} from {path:?}");
        load_file(&path)
    }
}
