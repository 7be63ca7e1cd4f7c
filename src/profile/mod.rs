//! Profile document storage.
//!
//! The profile is a single UTF-8 markdown document, opaque to this layer.
//! Every write replaces the whole file; there is no merge and no locking.
//! All other components go through [`ProfileStore`] rather than touching the
//! file directly.

use crate::Result;
use std::path::{Path, PathBuf};

/// Default profile skeleton written by `clear` and substituted by the
/// updater when the profile is blank, so the model never starts from an
/// empty slate.
pub const DEFAULT_PROFILE: &str = "\
# User Profile

## Personal Information
- Nothing recorded yet.

## Interests
- Nothing recorded yet.

## Current Projects
- Nothing recorded yet.

## Preferences
- Nothing recorded yet.
";

/// Reads and writes the profile document at a fixed path.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    /// Location of the profile document.
    path: PathBuf,
}

impl ProfileStore {
    /// Creates a store for the given profile path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store from configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::PromemConfig) -> Self {
        Self::new(&config.profile_path)
    }

    /// The profile document's location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the profile contents.
    ///
    /// An absent file is not an error: it reads as the empty string, matching
    /// the profile's lifecycle (nothing exists until the first save).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OperationFailed`] on I/O failures other than
    /// the file being absent.
    pub fn load(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(crate::Error::operation("load_profile", e)),
        }
    }

    /// Saves `text` as the new profile contents, replacing the previous
    /// document wholesale.
    ///
    /// Creates the containing directory if missing (idempotent). Adequate
    /// for the intended single-writer deployment; concurrent external
    /// writers are last-writer-wins.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OperationFailed`] if the directory cannot be
    /// created or the write fails.
    pub fn save(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::Error::operation("create_profile_dir", e))?;
        }
        std::fs::write(&self.path, text).map_err(|e| crate::Error::operation("save_profile", e))
    }

    /// Resets the profile to the default skeleton.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OperationFailed`] if the write fails.
    pub fn clear(&self) -> Result<()> {
        self.save(DEFAULT_PROFILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        ProfileStore::new(dir.path().join("memory").join("profile.md"))
    }

    #[test]
    fn test_load_fresh_environment_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().unwrap(), "");
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let content = "# User Profile\n\n## Interests\n- Rust\n- SQLite internals\n";
        store.save(content).unwrap();
        assert_eq!(store.load().unwrap(), content);
    }

    #[test]
    fn test_save_empty_string_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save("some content").unwrap();
        store.save("").unwrap();
        assert_eq!(store.load().unwrap(), "");
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("a").join("b").join("profile.md"));

        store.save("nested").unwrap();
        assert_eq!(store.load().unwrap(), "nested");
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save("first version with a lot of text").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap(), "second");
    }

    #[test]
    fn test_clear_writes_default_skeleton() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.clear().unwrap();
        let profile = store.load().unwrap();
        assert_eq!(profile, DEFAULT_PROFILE);
        assert!(profile.contains("## Personal Information"));
        assert!(profile.contains("## Interests"));
        assert!(profile.contains("## Current Projects"));
        assert!(profile.contains("## Preferences"));
    }

    #[test]
    fn test_load_surfaces_non_missing_io_errors() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the read fail with
        // something other than NotFound.
        let path = dir.path().join("profile.md");
        std::fs::create_dir(&path).unwrap();

        let store = ProfileStore::new(&path);
        assert!(store.load().is_err());
    }
}
