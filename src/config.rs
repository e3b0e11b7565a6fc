//! Configuration module for the TankWatch overlay.
//!
//! This module provides functionality for managing application configuration,
//! including:
//! - Where the stats service lives and how long to wait for it
//! - Which global chord toggles the overlay group
//! - Where the static matchup table is read from
//! - Determining the appropriate data directory for the application
//!
//! The configuration is loaded from a `config.json` file located in the
//! platform-specific application data directory (%APPDATA%/TankWatch/ on
//! Windows). Widget state (window geometry, selected hero, username) lives in
//! the separate durable store, see [`crate::store`].
//!
//! # Example
//!
//! ```rust,no_run
//! use tankwatch::config::load_config;
//!
//! let config = load_config();
//! println!("Toggle with {}", config.toggle_shortcut.display_text());
//! ```

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const STORE_FILE: &str = "store.json";
pub const MATCHUPS_FILE: &str = "matchups.json";

/// Modifier flags plus a main key, e.g. Ctrl + Shift + T
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shortcut {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
    /// Main key (A-Z, 0-9, F1-F12)
    pub key: String,
}

impl Default for Shortcut {
    fn default() -> Self {
        Shortcut {
            ctrl: true,
            alt: false,
            shift: true,
            win: false,
            key: "T".to_string(),
        }
    }
}

impl Shortcut {
    /// Check if shortcut is valid (has at least one modifier and a key)
    pub fn is_valid(&self) -> bool {
        let has_modifier = self.ctrl || self.alt || self.shift || self.win;
        has_modifier && !self.key.trim().is_empty()
    }

    pub fn display_text(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.win {
            parts.push("Win");
        }
        if !self.key.is_empty() {
            parts.push(&self.key);
        }
        if parts.is_empty() {
            "Not set".to_string()
        } else {
            parts.join(" + ")
        }
    }
}

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the stats service, without trailing slash
    pub stats_api_base_url: String,
    /// HTTP timeout for a single stats request
    pub request_timeout_secs: u64,
    /// Chord that shows/hides the whole overlay group
    pub toggle_shortcut: Shortcut,
    /// Override for the static matchup table location
    pub matchups_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            stats_api_base_url: "https://overfast-api.tekrop.fr".to_string(),
            request_timeout_secs: 10,
            toggle_shortcut: Shortcut::default(),
            matchups_path: None,
        }
    }
}

impl AppConfig {
    /// Candidate locations for the matchup table, most specific first
    pub fn matchup_candidates(&self, data_dir: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(ref path) = self.matchups_path {
            paths.push(path.clone());
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            paths.push(exe_dir.join(MATCHUPS_FILE));
        }
        paths.push(data_dir.join(MATCHUPS_FILE));
        paths.push(PathBuf::from("assets").join(MATCHUPS_FILE));
        paths
    }
}

/// Get the application's data directory
/// Returns %APPDATA%/TankWatch/ on Windows
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "TankWatch")
        .ok_or_else(|| anyhow!("Failed to determine user data directory"))?;

    let data_dir = project_dirs.data_dir();

    fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory: {}", e))?;

    Ok(data_dir.to_path_buf())
}

/// Load application configuration from config.json
/// Returns default config if file doesn't exist or on error
pub fn load_config() -> AppConfig {
    let Ok(data_dir) = get_data_directory() else {
        return AppConfig::default();
    };
    load_config_from(&data_dir.join(CONFIG_FILE))
}

/// Load configuration from an explicit path, falling back to defaults
pub fn load_config_from(path: &Path) -> AppConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return AppConfig::default();
    };

    match serde_json::from_str::<AppConfig>(&contents) {
        Ok(mut config) => {
            if !config.toggle_shortcut.is_valid() {
                tracing::warn!(
                    "Toggle shortcut {} has no modifier, using {}",
                    config.toggle_shortcut.display_text(),
                    Shortcut::default().display_text()
                );
                config.toggle_shortcut = Shortcut::default();
            }
            config
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}
