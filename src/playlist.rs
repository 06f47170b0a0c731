use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::selector::PlaylistView;

pub const PRESET_EXTENSION: &str = "milk";
pub const DELETED_DIR: &str = "deleted";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaylistError {
    #[error("preset directory {0} does not exist")]
    MissingRoot(PathBuf),
    #[error("playlist is empty")]
    Empty,
    #[error("I/O error: {0}")]
    Io(String),
}

/// Preset files found under a root directory, in path order.
#[derive(Debug, Clone)]
pub struct DirectoryPlaylist {
    root: PathBuf,
    items: Vec<String>,
    position: u32,
}

impl DirectoryPlaylist {
    pub fn scan(root: impl Into<PathBuf>) -> Result<Self, PlaylistError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PlaylistError::MissingRoot(root));
        }
        let mut paths = Vec::new();
        collect_presets(&root, &root.join(DELETED_DIR), &mut paths)?;
        paths.sort();
        let items = paths
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        info!(root = %root.display(), presets = items.len(), "scanned preset directory");
        Ok(Self {
            root,
            items,
            position: 0,
        })
    }

    pub fn from_items(root: impl Into<PathBuf>, items: Vec<String>) -> Self {
        Self {
            root: root.into(),
            items,
            position: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self) -> Option<u32> {
        (!self.items.is_empty()).then_some(self.position)
    }

    /// Out-of-range indices are ignored.
    pub fn set_position(&mut self, index: u32) -> bool {
        if (index as usize) < self.items.len() {
            self.position = index;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.items.get(self.position as usize).map(String::as_str)
    }

    pub fn next(&mut self) -> Option<u32> {
        let len = self.size();
        if len == 0 {
            return None;
        }
        self.position = (self.position + 1) % len;
        Some(self.position)
    }

    pub fn previous(&mut self) -> Option<u32> {
        let len = self.size();
        if len == 0 {
            return None;
        }
        self.position = if self.position == 0 {
            len - 1
        } else {
            self.position - 1
        };
        Some(self.position)
    }

    /// Moves the current preset file into `<root>/deleted/` and drops it from
    /// the playlist. Returns the moved file's new path.
    pub fn trash_current(&mut self) -> Result<PathBuf, PlaylistError> {
        let idx = self.position as usize;
        let Some(item) = self.items.get(idx) else {
            return Err(PlaylistError::Empty);
        };
        let src = PathBuf::from(item);
        let file_name = src
            .file_name()
            .ok_or_else(|| PlaylistError::Io(format!("no file name in {}", src.display())))?;
        let deleted_dir = self.root.join(DELETED_DIR);
        std::fs::create_dir_all(&deleted_dir).map_err(|e| PlaylistError::Io(e.to_string()))?;
        let dest = deleted_dir.join(file_name);
        if dest.exists() {
            return Err(PlaylistError::Io(format!("{} already exists", dest.display())));
        }
        std::fs::rename(&src, &dest).map_err(|e| PlaylistError::Io(e.to_string()))?;

        self.items.remove(idx);
        if self.position as usize >= self.items.len() {
            self.position = 0;
        }
        debug!(from = %src.display(), to = %dest.display(), "trashed preset");
        Ok(dest)
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

impl PlaylistView for DirectoryPlaylist {
    fn size(&self) -> u32 {
        u32::try_from(self.items.len()).unwrap_or(u32::MAX)
    }

    fn item_at(&self, index: u32) -> Option<&str> {
        self.items.get(index as usize).map(String::as_str)
    }
}

fn collect_presets(dir: &Path, skip: &Path, out: &mut Vec<PathBuf>) -> Result<(), PlaylistError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PlaylistError::Io(e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| PlaylistError::Io(e.to_string()))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| PlaylistError::Io(e.to_string()))?;
        if file_type.is_dir() {
            if path != skip {
                collect_presets(&path, skip, out)?;
            }
        } else if is_preset_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_preset_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(PRESET_EXTENSION))
        .unwrap_or(false)
}
