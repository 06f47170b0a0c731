use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_RATING: u8 = 5;
pub const FAVORITE_RATING: u8 = 9;
pub const MAX_RATING: u8 = 9;

const SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("rating {0} is out of range (0 clears, 1-9 rates)")]
    OutOfRange(u8),
    #[error("invalid preset name {0:?}")]
    InvalidName(String),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Basename of a preset path; both `/` and `\` count as separators.
pub fn preset_file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Preset basename -> rating in `1..=9`, mirrored to a flat text file.
///
/// Each line of the file reads `<rating>|<file name>`. The whole file is
/// rewritten after every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RatingStore {
    ratings: BTreeMap<String, u8>,
    path: Option<PathBuf>,
}

impl RatingStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Empty store that still saves to `path`. The first save replaces
    /// whatever the file held.
    pub fn empty_at(path: impl Into<PathBuf>) -> Self {
        Self {
            ratings: BTreeMap::new(),
            path: Some(path.into()),
        }
    }

    /// A missing file is an empty store; malformed lines are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RatingError> {
        let path = path.into();
        let bytes = match std::fs::read(&path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(RatingError::Io(err.to_string())),
        };
        let mut store = Self::parse(&bytes);
        debug!(path = %path.display(), rated = store.ratings.len(), "loaded ratings");
        store.path = Some(path);
        Ok(store)
    }

    /// Lines that are not UTF-8 count as malformed.
    pub fn parse(text: impl AsRef<[u8]>) -> Self {
        let mut ratings = BTreeMap::new();
        for (line_idx, raw) in text.as_ref().split(|&b| b == b'\n').enumerate() {
            let Ok(line) = std::str::from_utf8(raw) else {
                warn!(line = line_idx + 1, "skipping non-UTF-8 rating entry");
                continue;
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((rating, name)) => {
                    ratings.insert(name.to_string(), rating);
                }
                None => warn!(line = line_idx + 1, "skipping malformed rating entry"),
            }
        }
        Self {
            ratings,
            path: None,
        }
    }

    pub fn to_text(&self) -> String {
        let mut body = String::new();
        for (name, rating) in &self.ratings {
            body.push_str(&format!("{rating}{SEPARATOR}{name}\n"));
        }
        body
    }

    pub fn save(&self) -> Result<(), RatingError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RatingError::Io(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_text()).map_err(|e| RatingError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| RatingError::Io(e.to_string()))
    }

    /// `0` clears the entry. The in-memory change sticks even when saving
    /// fails; the save error is returned so the caller can report it.
    pub fn set_rating(&mut self, preset: &str, rating: u8) -> Result<(), RatingError> {
        if rating > MAX_RATING {
            return Err(RatingError::OutOfRange(rating));
        }
        let name = preset_file_name(preset);
        if name.is_empty() || name.contains(['\n', '\r', SEPARATOR]) {
            return Err(RatingError::InvalidName(name.to_string()));
        }
        if rating == 0 {
            self.ratings.remove(name);
        } else {
            self.ratings.insert(name.to_string(), rating);
        }
        self.save()
    }

    pub fn clear_rating(&mut self, preset: &str) -> Result<(), RatingError> {
        self.set_rating(preset, 0)
    }

    pub fn rating(&self, preset: &str) -> u8 {
        self.stored_rating(preset).unwrap_or(DEFAULT_RATING)
    }

    pub fn stored_rating(&self, preset: &str) -> Option<u8> {
        self.ratings.get(preset_file_name(preset)).copied()
    }

    pub fn is_favorite(&self, preset: &str) -> bool {
        self.stored_rating(preset) == Some(FAVORITE_RATING)
    }

    pub fn rated_count(&self) -> usize {
        self.ratings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.ratings.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn parse_line(line: &str) -> Option<(u8, &str)> {
    let (rating_raw, name) = line.split_once(SEPARATOR)?;
    let rating = rating_raw.trim().parse::<u8>().ok()?;
    if !(1..=MAX_RATING).contains(&rating) || name.is_empty() || name.contains(SEPARATOR) {
        return None;
    }
    Some((rating, name))
}

pub fn ratings_storage_path() -> Option<PathBuf> {
    let base = dirs::config_dir()?;
    Some(base.join("preset_deck").join("ratings.txt"))
}
