//! Validation dispatch
//!
//! Runs every candidate file through its own engine session and turns each
//! outcome into exactly one [`FileResult`]. Failures are isolated per file:
//! nothing a single document does (malformed content, I/O errors, a panic in
//! the engine, a timeout) can abort the batch or affect another file.
//!
//! Files are fanned out as tokio tasks bounded by a semaphore. The engine work
//! itself is blocking and runs under `spawn_blocking`; the compiled schema is
//! shared read-only by every task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::engine::{Diagnostic, SchemaHandle, SeverityPolicy};
use crate::file_discovery::relative_to;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Number of files validated at once
    pub max_concurrent_validations: usize,
    /// Upper bound on a single file's validation (None = unbounded)
    pub validation_timeout: Option<Duration>,
    /// Which diagnostics make a file fail
    pub severity_policy: SeverityPolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: num_cpus::get(),
            validation_timeout: None,
            severity_policy: SeverityPolicy::ERRORS_ONLY,
        }
    }
}

/// Outcome of validating one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Valid,
    Invalid { diagnostics: Vec<Diagnostic> },
    /// Validation could not run at all
    Unreadable { reason: String },
}

impl FileOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, FileOutcome::Valid)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_valid()
    }
}

/// Result record for a single candidate file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    /// Absolute path of the validated file
    pub path: PathBuf,
    /// Path relative to the run's base directory, as shown in reports
    pub relative_path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileResult {
    pub fn new(path: PathBuf, base: &Path, outcome: FileOutcome) -> Self {
        let relative_path = relative_to(base, &path);
        Self {
            path,
            relative_path,
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }
}

/// Validate one file with a fresh session.
///
/// Never fails: every error is folded into the returned [`FileOutcome`].
pub fn validate_file(
    schema: &dyn SchemaHandle,
    policy: SeverityPolicy,
    base: &Path,
    file: &Path,
) -> FileResult {
    let start = Instant::now();
    let outcome = run_session(schema, policy, file);
    let elapsed = start.elapsed();

    match &outcome {
        FileOutcome::Valid => debug!(file = %file.display(), ?elapsed, "valid"),
        FileOutcome::Invalid { diagnostics } => {
            debug!(file = %file.display(), ?elapsed, errors = diagnostics.len(), "invalid")
        }
        FileOutcome::Unreadable { reason } => {
            debug!(file = %file.display(), ?elapsed, %reason, "unreadable")
        }
    }

    FileResult::new(file.to_path_buf(), base, outcome)
}

fn run_session(schema: &dyn SchemaHandle, policy: SeverityPolicy, file: &Path) -> FileOutcome {
    let content = match std::fs::read(file) {
        Ok(content) => content,
        Err(e) => {
            return FileOutcome::Unreadable {
                reason: e.to_string(),
            };
        }
    };

    let mut session = match schema.new_session() {
        Ok(session) => session,
        Err(e) => {
            return FileOutcome::Unreadable {
                reason: e.to_string(),
            };
        }
    };

    match session.validate(file, &content) {
        Ok(diagnostics) => {
            let failures = policy.retain_failures(diagnostics);
            if failures.is_empty() {
                FileOutcome::Valid
            } else {
                FileOutcome::Invalid {
                    diagnostics: failures,
                }
            }
        }
        Err(e) => FileOutcome::Unreadable {
            reason: e.to_string(),
        },
    }
}

/// Parallel dispatcher over a shared schema
pub struct ValidationEngine {
    schema: Arc<dyn SchemaHandle>,
    base: Arc<PathBuf>,
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(schema: Arc<dyn SchemaHandle>, base: PathBuf, config: ValidationConfig) -> Self {
        Self {
            schema,
            base: Arc::new(base),
            config,
        }
    }

    /// Validate `files`, returning one result per file in the same order.
    pub async fn validate_files(&self, files: Vec<PathBuf>) -> Vec<FileResult> {
        if files.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(
            self.config.max_concurrent_validations.max(1),
        ));

        let tasks: Vec<_> = files
            .iter()
            .cloned()
            .map(|file| {
                let schema = Arc::clone(&self.schema);
                let base = Arc::clone(&self.base);
                let semaphore = Arc::clone(&semaphore);
                let policy = self.config.severity_policy;
                let timeout = self.config.validation_timeout;

                tokio::spawn(async move {
                    // The semaphore is never closed
                    let permit = semaphore.acquire_owned().await.ok();
                    Self::validate_in_background(schema, base, policy, timeout, file, permit)
                        .await
                })
            })
            .collect();

        // join_all yields in task order, which is discovery order
        join_all(tasks)
            .await
            .into_iter()
            .zip(files)
            .map(|(joined, file)| match joined {
                Ok(result) => result,
                Err(e) => FileResult::new(
                    file,
                    &self.base,
                    FileOutcome::Unreadable {
                        reason: format!("validation task failed: {}", e),
                    },
                ),
            })
            .collect()
    }

    async fn validate_in_background(
        schema: Arc<dyn SchemaHandle>,
        base: Arc<PathBuf>,
        policy: SeverityPolicy,
        timeout: Option<Duration>,
        file: PathBuf,
        permit: Option<OwnedSemaphorePermit>,
    ) -> FileResult {
        let blocking = {
            let file = file.clone();
            let base = Arc::clone(&base);
            // The permit lives as long as the engine call, even after a timeout
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                validate_file(&*schema, policy, &base, &file)
            })
        };

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, blocking).await {
                Ok(joined) => joined,
                Err(_) => {
                    return FileResult::new(
                        file,
                        &base,
                        FileOutcome::Unreadable {
                            reason: format!("validation timed out after {:?}", limit),
                        },
                    );
                }
            },
            None => blocking.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) => {
                let reason = if e.is_panic() {
                    "validation engine panicked".to_string()
                } else {
                    format!("validation task failed: {}", e)
                };
                FileResult::new(file, &base, FileOutcome::Unreadable { reason })
            }
        }
    }
}
