//! Persistence of the navigation stack between sessions.
//!
//! The stack is saved as the list of names used to enter each level above the
//! root, e.g. `{"path": ["configure", "ra"]}`, and replayed as a path on the
//! next startup. Writes go through [`atomic_write_json`] (write to `.tmp` then
//! rename) so a crash never leaves a truncated file behind.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Atomically write JSON data to a file.
///
/// Creates parent directories if they don't exist.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write raw bytes to a file.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

/// Where the navigation stack is kept between sessions.
pub trait StackStore: Send {
    /// Record the names used to enter each level above the root.
    fn save(&mut self, path: &[String]) -> io::Result<()>;

    /// The last saved path, if any.
    fn load(&self) -> io::Result<Option<Vec<String>>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SavedStack {
    path: Vec<String>,
}

/// Stack store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileStackStore {
    path: PathBuf,
}

impl FileStackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `stack.json` in the platform data directory, if one can be determined.
    pub fn default_location() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "clush", "clush")
            .map(|dirs| dirs.data_dir().join("stack.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StackStore for FileStackStore {
    fn save(&mut self, path: &[String]) -> io::Result<()> {
        atomic_write_json(
            &self.path,
            &SavedStack {
                path: path.to_vec(),
            },
        )
    }

    fn load(&self) -> io::Result<Option<Vec<String>>> {
        Ok(load_json::<SavedStack>(&self.path)?.map(|saved| saved.path))
    }
}

/// In-memory stack store. Clones share the same slot, so a test can keep one
/// clone to inspect what the shell saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStackStore {
    saved: Arc<Mutex<Option<Vec<String>>>>,
}

impl MemoryStackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `path`.
    pub fn with_path(path: &[&str]) -> Self {
        let store = Self::new();
        if let Ok(mut saved) = store.saved.lock() {
            *saved = Some(path.iter().map(|s| s.to_string()).collect());
        }
        store
    }

    pub fn saved(&self) -> Option<Vec<String>> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }
}

impl StackStore for MemoryStackStore {
    fn save(&mut self, path: &[String]) -> io::Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        *saved = Some(path.to_vec());
        Ok(())
    }

    fn load(&self) -> io::Result<Option<Vec<String>>> {
        Ok(self.saved())
    }
}
