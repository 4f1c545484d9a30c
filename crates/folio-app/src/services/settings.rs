// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings persisted as pretty-printed JSON in the data directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use folio_bridge::SettingsStore;
use folio_core::AppConfig;
use folio_core::error::Result;

pub const CONFIG_FILE: &str = "config.json";

/// `config.json` backed settings.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `CONFIG_FILE` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    /// Missing or damaged files yield defaults.
    fn load(&self) -> Result<AppConfig> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no settings file; using defaults");
                return Ok(AppConfig::default());
            }
        };

        match serde_json::from_str(&data) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "settings file unreadable; using defaults");
                Ok(AppConfig::default())
            }
        }
    }

    fn save(&self, config: &AppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use folio_core::config::{Language, Theme};

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonSettingsStore::in_dir(dir.path());
        assert_eq!(store.load().expect("load"), AppConfig::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonSettingsStore::in_dir(dir.path());
        let config = AppConfig {
            language: Language::ZhCn,
            theme: Theme::Dark,
            last_output_path: "/books/novel.epub".into(),
            engine_path: Some("/opt/folio/engine".into()),
        };

        store.save(&config).expect("save");
        assert_eq!(store.load().expect("load"), config);

        let raw = std::fs::read_to_string(store.path()).expect("read");
        assert!(raw.contains("\"zh-CN\""));
        assert!(raw.contains("\"dark\""));
    }

    #[test]
    fn damaged_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonSettingsStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ not json").expect("write");
        assert_eq!(store.load().expect("load"), AppConfig::default());
    }
}
