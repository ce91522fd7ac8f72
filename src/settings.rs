/// Settings management — load, save, and resolve client configuration.

use crate::logging::{client_error, client_info, client_warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientSettings {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Cadence for the headline log feed (admin dashboard).
    #[serde(default = "default_logs_poll_secs")]
    pub logs_poll_secs: u64,
    /// Cadence for the stats cards.
    #[serde(default = "default_stats_poll_secs")]
    pub stats_poll_secs: u64,
    /// Cadence for chart aggregation.
    #[serde(default = "default_charts_poll_secs")]
    pub charts_poll_secs: u64,
    #[serde(default = "default_tts_enabled")]
    pub tts_enabled: bool,
    #[serde(default = "default_tts_volume")]
    pub tts_volume: f32,
}

fn default_gateway_url() -> String {
    env::var("EDULINE_GATEWAY_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}
fn default_logs_poll_secs() -> u64 { 10 }
fn default_stats_poll_secs() -> u64 { 30 }
fn default_charts_poll_secs() -> u64 { 60 }
fn default_tts_enabled() -> bool { true }
fn default_tts_volume() -> f32 { 1.0 }

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            gateway_url: default_gateway_url(),
            logs_poll_secs: default_logs_poll_secs(),
            stats_poll_secs: default_stats_poll_secs(),
            charts_poll_secs: default_charts_poll_secs(),
            tts_enabled: default_tts_enabled(),
            tts_volume: default_tts_volume(),
        }
    }
}

/// Load `.env` once so `EDULINE_*` overrides are visible before defaults
/// are resolved. Missing files are fine.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        client_info("Loaded environment overrides from .env");
    }
}

pub fn settings_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eduline");
    if let Err(err) = fs::create_dir_all(&config_dir) {
        client_warn(format!(
            "Failed to create config directory {}: {}",
            config_dir.display(),
            err
        ));
    }
    config_dir.join("settings.json")
}

/// Load settings from disk, falling back to defaults on any failure.
pub fn load_settings() -> ClientSettings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &PathBuf) -> ClientSettings {
    if !path.exists() {
        client_warn(format!("Settings file not found at {}. Using defaults.", path.display()));
        return ClientSettings::default();
    }

    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            client_error(format!("Failed to read settings file {}: {}", path.display(), err));
            return ClientSettings::default();
        }
    };

    match serde_json::from_str::<ClientSettings>(&data) {
        Ok(settings) => settings,
        Err(err) => {
            client_error(format!("Failed to parse settings: {}", err));
            ClientSettings::default()
        }
    }
}

pub fn save_settings(settings: &ClientSettings) -> Result<(), String> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &ClientSettings, path: &PathBuf) -> Result<(), String> {
    let json = serde_json::to_string_pretty(settings).map_err(|e| {
        client_error(format!("Failed to serialize settings: {}", e));
        e.to_string()
    })?;
    fs::write(path, json).map_err(|e| {
        client_error(format!("Failed to write settings file {}: {}", path.display(), e));
        e.to_string()
    })?;
    client_info(format!("Settings saved to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = ClientSettings::default();
        assert_eq!(s.logs_poll_secs, 10);
        assert_eq!(s.stats_poll_secs, 30);
        assert_eq!(s.charts_poll_secs, 60);
        assert!(s.tts_enabled);
        assert_eq!(s.tts_volume, 1.0);
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut s = ClientSettings::default();
        s.gateway_url = "http://10.0.0.2:8000".into();
        s.logs_poll_secs = 5;
        s.tts_volume = 0.5;

        save_settings_to(&s, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded, s);
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "logs_poll_secs": 3 }"#).unwrap();

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.logs_poll_secs, 3);
        assert_eq!(loaded.stats_poll_secs, 30);
        assert!(loaded.tts_enabled);
    }

    #[test]
    fn unreadable_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json at all").unwrap();

        assert_eq!(load_settings_from(&path), ClientSettings::default());
    }
}
