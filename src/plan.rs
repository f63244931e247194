use crate::error::{ComposeError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

pub const BOOK_COUNT: u32 = 66;

/// English book names, Genesis = 1 ... Revelation = 66
const BOOK_NAMES: [&str; BOOK_COUNT as usize] = [
    "Genesis",
    "Exodus",
    "Leviticus",
    "Numbers",
    "Deuteronomy",
    "Joshua",
    "Judges",
    "Ruth",
    "1 Samuel",
    "2 Samuel",
    "1 Kings",
    "2 Kings",
    "1 Chronicles",
    "2 Chronicles",
    "Ezra",
    "Nehemiah",
    "Esther",
    "Job",
    "Psalms",
    "Proverbs",
    "Ecclesiastes",
    "Song of Solomon",
    "Isaiah",
    "Jeremiah",
    "Lamentations",
    "Ezekiel",
    "Daniel",
    "Hosea",
    "Joel",
    "Amos",
    "Obadiah",
    "Jonah",
    "Micah",
    "Nahum",
    "Habakkuk",
    "Zephaniah",
    "Haggai",
    "Zechariah",
    "Malachi",
    "Matthew",
    "Mark",
    "Luke",
    "John",
    "Acts",
    "Romans",
    "1 Corinthians",
    "2 Corinthians",
    "Galatians",
    "Ephesians",
    "Philippians",
    "Colossians",
    "1 Thessalonians",
    "2 Thessalonians",
    "1 Timothy",
    "2 Timothy",
    "Titus",
    "Philemon",
    "Hebrews",
    "James",
    "1 Peter",
    "2 Peter",
    "1 John",
    "2 John",
    "3 John",
    "Jude",
    "Revelation",
];

/// A single chapter, identified by book number (1-66) and chapter number (>= 1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChapterRef {
    book: u32,
    chapter: u32,
}

impl ChapterRef {
    pub fn new(book: u32, chapter: u32) -> Result<Self> {
        if !(1..=BOOK_COUNT).contains(&book) || chapter == 0 {
            return Err(ComposeError::InvalidChapterRef { book, chapter });
        }
        Ok(Self { book, chapter })
    }

    pub fn book(&self) -> u32 {
        self.book
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn book_name(&self) -> &'static str {
        BOOK_NAMES[(self.book - 1) as usize]
    }

    /// File stem used by chapter audio storage, e.g. `001_002` for Genesis 2
    pub fn file_stem(&self) -> String {
        format!("{:03}_{:03}", self.book, self.chapter)
    }
}

impl Display for ChapterRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({}:{})", self.book_name(), self.chapter, self.book, self.chapter)
    }
}

/// Parses `book:chapter`, e.g. `43:16` for John 16
impl FromStr for ChapterRef {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ComposeError::ParseChapterRef(s.trim().to_string());

        let (book, chapter) = s.trim().split_once(':').ok_or_else(invalid)?;
        let book = book.trim().parse().map_err(|_| invalid())?;
        let chapter = chapter.trim().parse().map_err(|_| invalid())?;

        ChapterRef::new(book, chapter)
    }
}

impl TryFrom<String> for ChapterRef {
    type Error = ComposeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ChapterRef> for String {
    fn from(value: ChapterRef) -> Self {
        format!("{}:{}", value.book, value.chapter)
    }
}

/// Ordered chapters for one output file. Order is reading order and is preserved exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechPlan {
    chapters: Vec<ChapterRef>,
}

impl SpeechPlan {
    pub fn new(chapters: Vec<ChapterRef>) -> Self {
        Self { chapters }
    }

    /// Parses a comma separated list like `1:1,1:2,43:16`. Blank entries are ignored.
    pub fn parse(list: &str) -> Result<Self> {
        let chapters = list
            .split([',', '\n'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ChapterRef::from_str)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { chapters })
    }

    pub fn chapters(&self) -> &[ChapterRef] {
        &self.chapters
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// English summary with consecutive chapters of a book collapsed into ranges,
    /// e.g. `Genesis 1-3; Exodus 4`
    pub fn describe(&self) -> String {
        let mut runs: Vec<(u32, Vec<u32>)> = Vec::new();

        for chapter in &self.chapters {
            match runs.last_mut() {
                Some((book, nums))
                    if *book == chapter.book
                        && nums.last().map(|n| n + 1) == Some(chapter.chapter) =>
                {
                    nums.push(chapter.chapter);
                }
                _ => runs.push((chapter.book, vec![chapter.chapter])),
            }
        }

        runs.into_iter()
            .map(|(book, nums)| {
                let name = BOOK_NAMES[(book - 1) as usize];
                match (nums.first(), nums.last()) {
                    (Some(first), Some(last)) if first != last => {
                        format!("{name} {first}-{last}")
                    }
                    _ => format!("{name} {}", nums.iter().join(", ")),
                }
            })
            .join("; ")
    }
}

impl<'a> IntoIterator for &'a SpeechPlan {
    type Item = &'a ChapterRef;
    type IntoIter = std::slice::Iter<'a, ChapterRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}

/// Maps a plan identifier and day number to the chapters read that day
pub trait PlanDayResolver: Send + Sync {
    fn resolve(&self, plan_id: &str, day: u32) -> anyhow::Result<SpeechPlan>;
}
