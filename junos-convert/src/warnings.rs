//! Per-configuration diagnostics.
//!
//! Every recoverable problem found while compiling is appended to a
//! [`Warnings`] sink owned by that configuration's compilation. Each entry is
//! also emitted as a `tracing` event so `-v` runs show diagnostics as they are
//! produced.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Likely misconfiguration; compiled behavior may differ from the device.
    RedFlag,
    /// Vendor feature with no model counterpart.
    Unimplemented,
    /// Legal but unusual construct.
    Pedantic,
    /// Named object that does not exist.
    UndefinedReference,
}

impl Display for WarningKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RedFlag => "red-flag",
            Self::Unimplemented => "unimplemented",
            Self::Pedantic => "pedantic",
            Self::UndefinedReference => "undefined-reference",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Warnings {
    entries: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: WarningKind, code: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(kind = %kind, code, "{message}");
        self.entries.push(Warning {
            kind,
            code: code.to_string(),
            message,
        });
    }

    pub fn red_flag(&mut self, code: &str, message: impl Into<String>) {
        self.push(WarningKind::RedFlag, code, message);
    }

    pub fn unimplemented(&mut self, code: &str, message: impl Into<String>) {
        self.push(WarningKind::Unimplemented, code, message);
    }

    pub fn pedantic(&mut self, code: &str, message: impl Into<String>) {
        self.push(WarningKind::Pedantic, code, message);
    }

    /// Record a reference to `name` (of type `what`) that does not resolve.
    pub fn undefined_reference(&mut self, what: &str, name: &str, context: &str) {
        self.push(
            WarningKind::UndefinedReference,
            "undefined_reference",
            format!("{what} '{name}' referenced by {context} is not defined"),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.entries.iter()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.entries.iter().filter(|w| w.kind == kind).count()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.entries.iter().any(|w| w.code == code)
    }
}
