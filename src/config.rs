//! Persistent settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::MAX_STRING_LENGTH;
use crate::util::{version_to_number, Result, V20_0_0_5};

/// Settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // New documents
    pub startup_version: String,
    pub user_version: u32,
    pub user_version2: u32,

    // Loading
    pub ignore_block_size: bool,
    pub max_string_length: u32,

    // Schema description used when none is given on the command line
    pub schema_path: Option<PathBuf>,

    // Recent files (most recent first, max 10)
    pub recent_files: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            startup_version: "20.0.0.5".into(),
            user_version: 0,
            user_version2: 0,
            ignore_block_size: true,
            max_string_length: MAX_STRING_LENGTH,
            schema_path: None,
            recent_files: Vec::new(),
        }
    }
}

const MAX_RECENT_FILES: usize = 10;

impl Settings {
    /// Settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("nifcore");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        match Self::path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Startup version as a number; 20.0.0.5 when unparseable.
    pub fn startup_version_number(&self) -> u32 {
        match version_to_number(&self.startup_version) {
            0 => V20_0_0_5,
            v => v,
        }
    }

    /// Add file to recent files list (moves to top if already present)
    pub fn add_recent(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| p != &path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    /// Recent files that still exist
    pub fn recent_files(&self) -> Vec<&PathBuf> {
        self.recent_files.iter().filter(|p| p.exists()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: Settings = serde_json::from_str(r#"{"user_version": 11}"#).unwrap();
        assert_eq!(s.user_version, 11);
        assert_eq!(s.startup_version, "20.0.0.5");
        assert!(s.ignore_block_size);
        assert_eq!(s.max_string_length, MAX_STRING_LENGTH);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("settings.json");
        let mut s = Settings { startup_version: "4.0.0.2".into(), ..Default::default() };
        s.add_recent("a.nif".into());
        s.add_recent("b.nif".into());
        s.add_recent("a.nif".into());
        s.save_to(&path).unwrap();
        let back = Settings::load_from(&path).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.recent_files, vec![PathBuf::from("a.nif"), PathBuf::from("b.nif")]);
        assert_eq!(back.startup_version_number(), 0x04000002);
    }

    #[test]
    fn test_bad_startup_version() {
        let s = Settings { startup_version: "garbage".into(), ..Default::default() };
        assert_eq!(s.startup_version_number(), V20_0_0_5);
    }
}
