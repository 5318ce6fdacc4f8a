use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::configuration::Configuration;

/// Errors that can occur while reading a compiled [`Configuration`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input was not a valid compiled configuration document.
    #[error("failed to parse compiled configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to read input file.
    #[error("failed to read compiled configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse JSON bytes into a [`Configuration`].
pub fn parse(bytes: &[u8]) -> Result<Configuration, ParseError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a file and parse it into a [`Configuration`].
pub fn parse_file(path: &Path) -> Result<Configuration, ParseError> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::{parse, ParseError};

    #[test]
    fn parses_minimal_document() {
        let config = parse(br#"{"hostname":"fw1"}"#).expect("parse");
        assert_eq!(config.hostname, "fw1");
        assert!(config.acls.is_empty());
    }

    #[test]
    fn rejects_malformed_document() {
        let err = parse(b"{").expect_err("malformed");
        assert!(matches!(err, ParseError::Json(_)));
    }
}
