use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::configuration::Configuration;

/// Errors that can occur while writing a compiled [`Configuration`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to serialize the configuration.
    #[error("failed to serialize compiled configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to write output file.
    #[error("failed to write compiled configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a [`Configuration`] into pretty-printed JSON bytes.
pub fn write(config: &Configuration) -> Result<Vec<u8>, WriteError> {
    let mut bytes = serde_json::to_vec_pretty(config)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize a [`Configuration`] and write it to `path`.
pub fn write_file(config: &Configuration, path: &Path) -> Result<(), WriteError> {
    let bytes = write(config)?;
    fs::write(path, bytes)?;
    Ok(())
}
