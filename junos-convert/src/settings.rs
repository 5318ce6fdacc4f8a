use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PAT_PORT_START: u16 = 1024;
pub const DEFAULT_PAT_PORT_END: u16 = 63487;

/// Knobs that shape compiled output without changing vendor semantics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertSettings {
    pub pat_port_start: u16,
    pub pat_port_end: u16,
    pub emit_trace_tags: bool,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            pat_port_start: DEFAULT_PAT_PORT_START,
            pat_port_end: DEFAULT_PAT_PORT_END,
            emit_trace_tags: true,
        }
    }
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("settings file {path} has PAT port range {start}-{end} with start above end")]
    InvalidPatRange { path: String, start: u16, end: u16 },
}

/// Load settings from `path`, or the embedded defaults when `path` is `None`.
///
/// Returns the settings together with a human-readable description of where
/// they came from.
pub fn load_settings(path: Option<&Path>) -> Result<(ConvertSettings, String), SettingsError> {
    let Some(path) = path else {
        return Ok((default_settings(), "embedded".to_string()));
    };
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let settings = parse_settings(&raw, path.display().to_string())?;
    Ok((settings, format!("file:{}", path.display())))
}

/// Built-in settings from `profiles/default.toml`.
pub fn default_settings() -> ConvertSettings {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/profiles/default.toml"));
    parse_settings(embedded, "embedded settings".to_string()).unwrap_or_default()
}

fn parse_settings(raw: &str, path: String) -> Result<ConvertSettings, SettingsError> {
    let settings: ConvertSettings = toml::from_str(raw).map_err(|source| SettingsError::Parse {
        path: path.clone(),
        source,
    })?;
    if settings.pat_port_start > settings.pat_port_end {
        return Err(SettingsError::InvalidPatRange {
            path,
            start: settings.pat_port_start,
            end: settings.pat_port_end,
        });
    }
    Ok(settings)
}
