use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::engine::SeverityPolicy;
use crate::error::{Result, ValidationError};
use crate::file_discovery::normalize_path;
use crate::output::OutputFormat;
use crate::validator::ValidationConfig;

/// Run configuration derived from the CLI
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub schema: PathBuf,
    /// Absolute, normalized input path
    pub path: PathBuf,
    pub threads: usize,
    pub timeout: Option<Duration>,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            schema: cli.schema.clone(),
            path: normalize_path(&cli.path)?,
            threads: cli.get_thread_count(),
            timeout: cli.timeout.map(Duration::from_secs),
            format: cli.format,
            verbose: cli.verbose,
        })
    }

    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            max_concurrent_validations: self.threads,
            validation_timeout: self.timeout,
            severity_policy: SeverityPolicy::ERRORS_ONLY,
        }
    }
}

/// Validate XML files against an XML Schema
#[derive(Parser, Debug, Clone)]
#[command(name = "xsd-validate")]
#[command(about = "Validate every .xml file in a file or directory tree against one XSD schema")]
#[command(version)]
pub struct Cli {
    /// XSD schema to validate against
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// XML file or directory to validate (directories are searched recursively)
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Number of files validated concurrently [default: number of CPUs]
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// Give up on a single file after this many seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Report format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Check the arguments before any file is touched
    pub fn validate(&self) -> Result<()> {
        if !self.schema.exists() {
            return Err(ValidationError::SchemaNotFound {
                path: self.schema.clone(),
            });
        }
        if !self.path.exists() {
            return Err(ValidationError::InputNotFound {
                path: self.path.clone(),
            });
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err(ValidationError::Usage(
                "Number of threads must be greater than 0".to_string(),
            ));
        }
        if let Some(timeout) = self.timeout
            && timeout == 0
        {
            return Err(ValidationError::Usage(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_thread_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["xsd-validate", "schema.xsd", "/tmp"]).unwrap();
        assert_eq!(cli.schema, PathBuf::from("schema.xsd"));
        assert_eq!(cli.path, PathBuf::from("/tmp"));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.threads.is_none());
        assert!(cli.timeout.is_none());
        assert_eq!(cli.get_thread_count(), num_cpus::get());
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "xsd-validate",
            "--threads",
            "3",
            "--timeout",
            "10",
            "--format",
            "json",
            "-v",
            "s.xsd",
            "in",
        ])
        .unwrap();
        assert_eq!(cli.threads, Some(3));
        assert_eq!(cli.timeout, Some(10));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert_eq!(cli.get_thread_count(), 3);
    }

    #[test]
    fn test_wrong_argument_count() {
        let missing = Cli::try_parse_from(["xsd-validate", "schema.xsd"]).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredArgument);

        let extra = Cli::try_parse_from(["xsd-validate", "a", "b", "c"]).unwrap_err();
        assert_eq!(extra.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_validate_missing_paths() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema.xsd");
        std::fs::write(&schema, "<xs:schema/>").unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("xsd-validate"),
            dir.path().join("missing.xsd").as_os_str(),
            dir.path().as_os_str(),
        ])
        .unwrap();
        assert!(matches!(
            cli.validate(),
            Err(ValidationError::SchemaNotFound { .. })
        ));

        let cli = Cli::try_parse_from([
            OsStr::new("xsd-validate"),
            schema.as_os_str(),
            dir.path().join("missing").as_os_str(),
        ])
        .unwrap();
        assert!(matches!(
            cli.validate(),
            Err(ValidationError::InputNotFound { .. })
        ));

        let cli =
            Cli::try_parse_from([OsStr::new("xsd-validate"), schema.as_os_str(), dir.path().as_os_str()])
                .unwrap();
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema.xsd");
        std::fs::write(&schema, "<xs:schema/>").unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("xsd-validate"),
            OsStr::new("--threads"),
            OsStr::new("0"),
            schema.as_os_str(),
            dir.path().as_os_str(),
        ])
        .unwrap();
        assert!(matches!(cli.validate(), Err(ValidationError::Usage(_))));
    }

    #[test]
    fn test_config_from_cli() {
        let cli = Cli::try_parse_from([
            "xsd-validate",
            "--timeout",
            "5",
            "schema.xsd",
            "data/./xml/../xml",
        ])
        .unwrap();
        let config = Config::from_cli(&cli).unwrap();

        assert!(config.path.is_absolute());
        assert!(config.path.ends_with("data/xml"));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));

        let validation = config.validation_config();
        assert_eq!(validation.validation_timeout, Some(Duration::from_secs(5)));
        assert_eq!(validation.severity_policy, SeverityPolicy::ERRORS_ONLY);
    }
}
