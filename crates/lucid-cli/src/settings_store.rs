use std::fs;
use std::path::{Path, PathBuf};

use lucid_core::Settings;
use thiserror::Error;

pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const API_KEY_ENV: &str = "LUCID_API_KEY";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("read {path} failed: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path} failed: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("write {path} failed: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize settings failed: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}

/// `settings.toml` inside the lucid home directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(lucid_home: &Path) -> Self {
        Self {
            path: lucid_home.join(SETTINGS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| SettingsError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        fs::write(&self.path, content).map_err(|source| SettingsError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Fills an empty `key` from `LUCID_API_KEY`.
pub fn apply_env_key(settings: &mut Settings, env_key: Option<String>) {
    if !settings.key.trim().is_empty() {
        return;
    }
    if let Some(key) = env_key.filter(|value| !value.trim().is_empty()) {
        settings.key = key.trim().to_string();
    }
}

pub fn set_value(settings: &mut Settings, key: &str, value: &str) -> Result<(), SettingsError> {
    let trimmed = value.trim();
    match key {
        "configured" => settings.configured = parse_bool(key, trimmed)?,
        "use_provider" => settings.use_provider = parse_bool(key, trimmed)?,
        "local_model" => settings.local_model = trimmed.to_string(),
        "local_url" => settings.local_url = trimmed.to_string(),
        "url" => settings.url = trimmed.to_string(),
        "key" => settings.key = trimmed.to_string(),
        "model" => settings.model = trimmed.to_string(),
        "context_window" => settings.context_window = parse_optional(key, trimmed)?,
        "turn_timeout_secs" => settings.turn_timeout_secs = parse_optional(key, trimmed)?,
        "log.level" => settings.log.level = non_empty(trimmed),
        "log.path" => settings.log.path = non_empty(trimmed),
        "log.stdout" => settings.log.stdout = Some(parse_bool(key, trimmed)?),
        _ => return Err(SettingsError::UnknownKey(key.to_string())),
    }
    Ok(())
}

/// TOML for display with the API key masked.
pub fn render_masked(settings: &Settings) -> Result<String, SettingsError> {
    let mut shown = settings.clone();
    shown.key = mask_key(&shown.key);
    Ok(toml::to_string_pretty(&shown)?)
}

fn mask_key(key: &str) -> String {
    let visible = key.chars().take(4).collect::<String>();
    match key.chars().count() {
        0 => String::new(),
        count if count <= 8 => "*".repeat(count),
        _ => format!("{visible}..."),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SettingsError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>, SettingsError> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| invalid(key, value))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
