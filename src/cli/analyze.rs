//! TUI-less analyze command

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::api::AnalyzeRequest;
use crate::core::config::Config;
use crate::core::event::Phase;
use crate::core::event_source::HttpEventSource;
use crate::core::stream_bridge::EventStream;
use crate::logging::TranscriptLog;
use crate::utils::url::{normalize_endpoint, with_default_scheme};

pub async fn run_analyze(
    text: Vec<String>,
    files: Vec<String>,
    endpoint: Option<String>,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let text = text.join(" ");
    if text.is_empty() && files.is_empty() {
        eprintln!("Usage: loglens <text> [-f <logfile>]...");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let endpoint = normalize_endpoint(&with_default_scheme(
        &config.resolve_endpoint(endpoint.as_deref()),
    ));

    let transcript = TranscriptLog::new(log_file)?;

    // The service reads files by path on its side; a missing local path is
    // usually a typo, but it is the service's call.
    for path in &files {
        if !Path::new(path).exists() {
            eprintln!("Warning: {path} does not exist locally; sending the path anyway");
        }
    }

    let request = AnalyzeRequest { text, files };

    // The blocking client is built and driven entirely on the worker thread.
    let mut events = EventStream::spawn(
        move || HttpEventSource::new(endpoint)?.open(&request),
        CancellationToken::new(),
    );

    let mut saw_error = false;
    while let Some(event) = events.recv().await {
        if transcript.is_active() {
            transcript.log_phase(event.phase.as_str(), &event.body)?;
        }

        match event.phase {
            Phase::Content => {
                println!();
                println!("{}", event.body);
            }
            Phase::Error => {
                saw_error = true;
                eprintln!("[ERROR] {}", event.body);
            }
            ref phase => {
                println!("[{}] {}", phase.as_str().to_uppercase(), event.body);
                io::stdout().flush()?;
            }
        }
    }

    if saw_error {
        std::process::exit(1);
    }
    Ok(())
}
