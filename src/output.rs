//! Run summary and reporting
//!
//! Folds the ordered [`FileResult`]s into a [`RunSummary`], renders it, and
//! owns the exit-code contract:
//!
//! | Situation                     | stdout                                | stderr         | code |
//! |-------------------------------|---------------------------------------|----------------|------|
//! | no candidate files            | `No XML files found.`                 |                | 0    |
//! | all candidates valid          | `All XML files are valid (N checked).`|                | 0    |
//! | at least one failure          |                                       | failure blocks | 2    |

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use crate::validator::{FileOutcome, FileResult};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VALIDATION_FAILED: i32 = 2;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text report
    #[default]
    Text,
    /// Single JSON document on stdout
    Json,
}

/// Final state of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Number of candidate files validated
    pub checked: usize,
    /// Failing files, in discovery order
    pub failures: Vec<FileResult>,
    pub exit_code: i32,
}

impl RunSummary {
    /// Fold results (in discovery order) into a summary
    pub fn summarize(results: Vec<FileResult>) -> Self {
        let checked = results.len();
        let failures: Vec<FileResult> = results.into_iter().filter(FileResult::is_failure).collect();
        let exit_code = if failures.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_VALIDATION_FAILED
        };

        Self {
            checked,
            failures,
            exit_code,
        }
    }

    pub fn nothing_found(&self) -> bool {
        self.checked == 0
    }

    pub fn all_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Renders a [`RunSummary`] to a pair of streams
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Write the report to stdout/stderr
    pub fn print(&self, summary: &RunSummary) -> io::Result<()> {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.render(summary, &mut stdout.lock(), &mut stderr.lock())
    }

    pub fn render<O: Write, E: Write>(
        &self,
        summary: &RunSummary,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => self.render_text(summary, out, err),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, summary)?;
                writeln!(out)
            }
        }
    }

    fn render_text<O: Write, E: Write>(
        &self,
        summary: &RunSummary,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<()> {
        if summary.nothing_found() {
            writeln!(out, "No XML files found.")?;
            return Ok(());
        }

        if summary.all_valid() {
            writeln!(out, "All XML files are valid ({} checked).", summary.checked)?;
            return Ok(());
        }

        for failure in &summary.failures {
            err.write_all(format_failure(failure).as_bytes())?;
            writeln!(err)?;
        }
        err.flush()
    }
}

/// `FAILED: <relative-path>` followed by one line per diagnostic, or the
/// raw reason for unreadable files
pub fn format_failure(result: &FileResult) -> String {
    let mut block = format!("FAILED: {}\n", result.relative_path.display());
    match &result.outcome {
        FileOutcome::Valid => {}
        FileOutcome::Invalid { diagnostics } => {
            for diagnostic in diagnostics {
                block.push_str(&format!("{}\n", diagnostic));
            }
        }
        FileOutcome::Unreadable { reason } => {
            block.push_str(reason);
            block.push('\n');
        }
    }
    block
}
