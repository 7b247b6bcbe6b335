//! Browser configuration
//!
//! A single options value is built at startup and handed to every component
//! that needs it. The JSON form uses the same keys as the browser's
//! `config.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Options controlling the cache, the location index and decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserOptions {
    /// Game identifier, used as the location index file stem
    pub game_identifier: String,
    /// Cache budget in megabytes of 1 000 000 bytes
    #[serde(rename = "tempFilesMaxMemoryMB")]
    pub temp_files_max_memory_mb: u64,
    /// Directory holding `<game_identifier>.ld` files
    pub light_dict_dir: PathBuf,
    /// Output directory for exported assets
    pub dump_folder: PathBuf,
    /// Diagnostic mode: trace every primitive read
    #[serde(rename = "dev")]
    pub diagnostic: bool,
    /// Resolve and decode referenced records while decoding
    pub follow_references: bool,
    /// Maximum record nesting depth
    pub max_depth: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            game_identifier: "ACU".to_string(),
            temp_files_max_memory_mb: 2048,
            light_dict_dir: PathBuf::from("resources/lightDict"),
            dump_folder: PathBuf::from("output"),
            diagnostic: false,
            follow_references: false,
            max_depth: 64,
        }
    }
}

impl BrowserOptions {
    /// Load options from a JSON file, falling back to defaults if it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write options as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Cache budget in bytes
    pub fn memory_budget(&self) -> u64 {
        self.temp_files_max_memory_mb.saturating_mul(1_000_000)
    }

    /// Path of the location index file for the configured game
    pub fn light_dict_path(&self) -> PathBuf {
        self.light_dict_dir.join(format!("{}.ld", self.game_identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BrowserOptions::default();
        assert_eq!(options.memory_budget(), 2_048_000_000);
        assert_eq!(
            options.light_dict_path(),
            PathBuf::from("resources/lightDict/ACU.ld")
        );
        assert!(!options.diagnostic);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: BrowserOptions =
            serde_json::from_str(r#"{"tempFilesMaxMemoryMB": 16, "dev": true}"#).unwrap();
        assert_eq!(options.memory_budget(), 16_000_000);
        assert!(options.diagnostic);
        assert_eq!(options.game_identifier, "ACU");
        assert_eq!(options.max_depth, 64);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let options = BrowserOptions::load(dir.path().join("config.json")).unwrap();
        assert_eq!(options, BrowserOptions::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let options = BrowserOptions {
            game_identifier: "ACS".to_string(),
            follow_references: true,
            ..Default::default()
        };
        options.save(&path).unwrap();
        assert_eq!(BrowserOptions::load(&path).unwrap(), options);
    }
}
