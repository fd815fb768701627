use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser, error::ErrorKind};

use xsd_validate::error::EXIT_USAGE;
use xsd_validate::{Cli, Config, Output, logging};

fn main() {
    let code = match try_main() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_USAGE
        }
    };
    process::exit(code);
}

fn try_main() -> anyhow::Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap exits with 2 on bad arguments; 2 means "files failed" here
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            e.print().context("failed to print usage")?;
            return Ok(code);
        }
    };

    logging::init(cli.verbose);

    if let Err(e) = cli.validate() {
        eprintln!("{}", e);
        eprintln!("{}", Cli::command().render_usage());
        return Ok(e.exit_code());
    }

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(e.exit_code());
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let outcome = runtime.block_on(xsd_validate::run(&config));
    // Timed-out validations may still be running on blocking threads
    runtime.shutdown_background();

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", e);
            if e.is_usage() {
                eprintln!("{}", Cli::command().render_usage());
            }
            return Ok(e.exit_code());
        }
    };

    Output::new(config.format)
        .print(&summary)
        .context("failed to write report")?;

    Ok(summary.exit_code)
}
