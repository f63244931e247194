//! Error types for daily audio composition

use crate::{buffer::AudioFormat, plan::ChapterRef};
use thiserror::Error;

/// Result type for composer operations
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Errors that can occur while composing a day's audio
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    /// A chapter in the speech plan could not be resolved to audio
    #[error("Chapter {0} is not available")]
    MissingChapter(ChapterRef),

    /// Speech plan has no chapters, so there is nothing to compose
    #[error("Speech plan is empty")]
    EmptyPlan,

    /// Background music was requested but the track pool is empty
    #[error("Background music requested but no BGM tracks are available")]
    NoBgmAvailable,

    /// Speed ratio is zero, negative or not a number
    #[error("Invalid speed ratio: {0} (must be a positive, finite number)")]
    InvalidRatio(f64),

    /// Buffer handed to loudness normalization is exactly silent
    #[error("Cannot normalize {0}: audio is silent")]
    DegenerateInput(String),

    /// Chapter reference outside the 66 books or with chapter 0
    #[error("Invalid chapter reference {book}:{chapter}")]
    InvalidChapterRef { book: u32, chapter: u32 },

    /// Text that is not a `book:chapter` pair
    #[error("Cannot parse chapter reference {0:?} (expected book:chapter)")]
    ParseChapterRef(String),

    /// Two buffers that must be joined disagree on sample rate or channel count
    #[error("Format mismatch in {stage}: expected {expected}, found {found}")]
    FormatMismatch {
        stage: &'static str,
        expected: AudioFormat,
        found: AudioFormat,
    },

    /// Audio file exists but could not be decoded
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
}
