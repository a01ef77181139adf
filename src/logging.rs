use chrono::Local;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

/// Optional append-only transcript of the streamed analysis phases.
///
/// Inactive (no file configured) transcripts make every call a no-op, so
/// callers don't have to branch.
pub struct TranscriptLog {
    file_path: Option<String>,
}

impl TranscriptLog {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let log = TranscriptLog {
            file_path: log_file,
        };

        // Fail up front if the file is not writable, not mid-stream.
        if let Some(path) = &log.file_path {
            log.test_file_access(path)?;
        }

        Ok(log)
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    /// Append one phase entry with a timestamp header.
    pub fn log_phase(&self, phase: &str, body: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(writer, "[{timestamp}] [{phase}]")?;
        for line in body.lines() {
            writeln!(writer, "{line}")?;
        }

        // Empty line after each entry for spacing
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        // Try to create/open the file to ensure we have write permissions
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        // Test write access
        file.flush()?;
        Ok(())
    }
}
