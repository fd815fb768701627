//! Schema engine seam
//!
//! The batch layer never interprets schema semantics. It only needs a schema
//! handle that can hand out validation sessions, and sessions that turn a
//! document into a list of diagnostics. [`crate::libxml2`] provides the
//! production implementation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Severity reported by the engine for a single diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// One validation problem as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            severity,
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, col {})",
            self.message, self.line, self.column
        )
    }
}

/// Which severities make a file fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityPolicy {
    pub warnings: bool,
    pub errors: bool,
    pub fatal: bool,
}

impl SeverityPolicy {
    /// Errors and fatal errors fail a file; warnings are dropped.
    pub const ERRORS_ONLY: SeverityPolicy = SeverityPolicy {
        warnings: false,
        errors: true,
        fatal: true,
    };

    pub fn counts(&self, severity: Severity) -> bool {
        match severity {
            Severity::Warning => self.warnings,
            Severity::Error => self.errors,
            Severity::Fatal => self.fatal,
        }
    }

    /// Keep only the diagnostics this policy counts as failures
    pub fn retain_failures(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .filter(|d| self.counts(d.severity))
            .collect()
    }
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::ERRORS_ONLY
    }
}

/// A compiled schema, immutable after construction and shareable across threads
#[cfg_attr(test, mockall::automock)]
pub trait SchemaHandle: Send + Sync {
    /// Start a fresh session for validating one document
    fn new_session(&self) -> EngineResult<Box<dyn ValidationSession>>;
}

/// Single-use validation state for one document
#[cfg_attr(test, mockall::automock)]
pub trait ValidationSession {
    /// Validate `content` (read from `file`) and return every diagnostic the
    /// engine raised, in the order it raised them.
    ///
    /// An `Err` means validation could not run at all, e.g. the document is
    /// not well-formed.
    fn validate(&mut self, file: &Path, content: &[u8]) -> EngineResult<Vec<Diagnostic>>;
}
