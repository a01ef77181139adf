//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches into the
//! analyze command or the configuration subcommands.

pub mod analyze;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::analyze::run_analyze;
use crate::core::config::Config;
use crate::utils::url::{normalize_endpoint, with_default_scheme};

#[derive(Parser)]
#[command(name = "loglens")]
#[command(about = "Stream log-analysis results from a remote analysis service")]
#[command(
    long_about = "Loglens submits a ticket id or problem description, plus optional log files, \
to a log-analysis service and renders the streamed response phase by phase.\n\n\
Environment Variables:\n\
  LOGLENS_ENDPOINT   Analysis endpoint URL (overridden by --endpoint)\n\
  RUST_LOG           Diagnostic log filter (warnings by default)\n\n\
Analysis can take several minutes; intermediate phases are printed as they\n\
arrive and the final report is printed last."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Text to analyze: a ticket id or a free-form problem description
    pub text: Vec<String>,

    /// Log file to send for analysis (repeatable)
    #[arg(short, long, value_name = "PATH")]
    pub file: Vec<String>,

    /// Analysis endpoint URL
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Append a transcript of the streamed phases to the given file
    #[arg(short, long, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        value: String,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Set { key, value }) => set_config_value(&key, &value),
        Some(Commands::Unset { key }) => unset_config_value(&key),
        None => run_analyze(args.text, args.file, args.endpoint, args.log).await,
    }
}

fn set_config_value(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    match key {
        "endpoint" => {
            let mut config = Config::load()?;
            let endpoint = normalize_endpoint(&with_default_scheme(value));
            config.endpoint = Some(endpoint.clone());
            config.save()?;
            println!("endpoint set to {endpoint}");
            Ok(())
        }
        other => Err(format!("Unknown configuration key: {other}. Valid keys: endpoint").into()),
    }
}

fn unset_config_value(key: &str) -> Result<(), Box<dyn Error>> {
    match key {
        "endpoint" => {
            let mut config = Config::load()?;
            config.endpoint = None;
            config.save()?;
            println!("endpoint unset");
            Ok(())
        }
        other => Err(format!("Unknown configuration key: {other}. Valid keys: endpoint").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_files_and_endpoint() {
        let args = Args::parse_from([
            "loglens",
            "OTT-90829",
            "login",
            "fails",
            "-f",
            "a.log",
            "--file",
            "b.log",
            "-e",
            "http://host:5001/analyze",
            "-l",
            "transcript.log",
        ]);

        assert!(args.command.is_none());
        assert_eq!(args.text, ["OTT-90829", "login", "fails"]);
        assert_eq!(args.file, ["a.log", "b.log"]);
        assert_eq!(args.endpoint.as_deref(), Some("http://host:5001/analyze"));
        assert_eq!(args.log.as_deref(), Some("transcript.log"));
    }

    #[test]
    fn parses_set_subcommand() {
        let args = Args::parse_from(["loglens", "set", "endpoint", "host:5001/analyze"]);
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert_eq!(key, "endpoint");
                assert_eq!(value, "host:5001/analyze");
            }
            _ => panic!("expected set subcommand"),
        }
    }

    #[test]
    fn parses_unset_subcommand() {
        let args = Args::parse_from(["loglens", "unset", "endpoint"]);
        assert!(matches!(
            args.command,
            Some(Commands::Unset { key }) if key == "endpoint"
        ));
    }
}
