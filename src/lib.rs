//! # xsd-validate
//!
//! Batch validation of XML documents against a single XSD schema.
//!
//! A run collects every `.xml` file under the input path, validates each one
//! in its own libxml2 session (in parallel, sharing one compiled schema), and
//! reports the failures in discovery order with a CI-friendly exit code.

pub mod cli;
pub mod engine;
pub mod error;
pub mod file_discovery;
pub mod libxml2;
pub mod logging;
pub mod output;
pub mod validator;

use std::sync::Arc;

use tracing::info;

pub use cli::{Cli, Config};
pub use engine::{Diagnostic, SchemaHandle, Severity, SeverityPolicy, ValidationSession};
pub use error::{EngineError, ValidationError};
pub use file_discovery::FileDiscovery;
pub use libxml2::LibXml2Schema;
pub use output::{Output, OutputFormat, RunSummary};
pub use validator::{FileOutcome, FileResult, ValidationConfig, ValidationEngine};

/// Load the schema, then validate everything under `config.path`
pub async fn run(config: &Config) -> error::Result<RunSummary> {
    let schema =
        LibXml2Schema::load(&config.schema).map_err(|e| ValidationError::SchemaLoad {
            path: config.schema.clone(),
            details: e.to_string(),
        })?;

    run_with_schema(Arc::new(schema), config).await
}

/// Validate everything under `config.path` against an already loaded schema
pub async fn run_with_schema(
    schema: Arc<dyn SchemaHandle>,
    config: &Config,
) -> error::Result<RunSummary> {
    let base = file_discovery::base_directory(&config.path)?;

    let discovery = FileDiscovery::new();
    let input = config.path.clone();
    let files = tokio::task::spawn_blocking(move || discovery.collect(&input))
        .await
        .map_err(|e| ValidationError::Concurrency {
            details: format!("file discovery failed: {}", e),
        })?;
    info!(files = files.len(), base = %base.display(), "starting validation");

    let engine = ValidationEngine::new(schema, base, config.validation_config());
    let results = engine.validate_files(files).await;

    let summary = RunSummary::summarize(results);
    info!(
        checked = summary.checked,
        failed = summary.failures.len(),
        "validation finished"
    );
    Ok(summary)
}
