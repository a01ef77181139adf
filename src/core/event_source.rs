//! Blocking transport for the analysis event stream.
//!
//! [`HttpEventSource`] POSTs the analysis request and reads the streamed
//! newline-delimited JSON body synchronously, one record per line. It is
//! the producer half of the bridge in [`crate::core::stream_bridge`];
//! nothing in this module touches the async runtime.

use std::error::Error as StdError;
use std::fmt;
use std::io::Read;
use std::time::Duration;

use memchr::memchr;

use crate::api::{AnalyzeRequest, StreamRecord};
use crate::core::event::AnalysisEvent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Faults that abort the whole stream. A malformed individual record is not
/// a fault; [`RecordIter`] skips it and keeps going.
#[derive(Debug)]
pub enum SourceError {
    /// The HTTP client could not be built or the connection failed.
    Connect(reqwest::Error),
    /// The service answered with a non-success status.
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The response body failed mid-stream.
    Read(std::io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Connect(_) => {
                write!(f, "Connection failed. Is the server running?")
            }
            SourceError::Http { status, body } => {
                if body.is_empty() {
                    write!(f, "Analysis request failed with status {status}")
                } else {
                    write!(f, "Analysis request failed with status {status}: {body}")
                }
            }
            SourceError::Read(source) => write!(f, "Lost the response stream: {source}"),
        }
    }
}

impl StdError for SourceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SourceError::Connect(source) => Some(source),
            SourceError::Http { .. } => None,
            SourceError::Read(source) => Some(source),
        }
    }
}

/// Blocking source of analysis events: one HTTP POST, one streamed response.
pub struct HttpEventSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpEventSource {
    /// Build a source for one endpoint. The request itself gets no overall
    /// timeout: an analysis run can stay quiet for minutes between phases.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .build()
            .map_err(SourceError::Connect)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// POST the request and hand back the blocking record iterator.
    pub fn open(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<RecordIter<reqwest::blocking::Response>, SourceError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            files = request.files.len(),
            "opening analysis stream"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(SourceError::Connect)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "<no body>".to_string());
            return Err(SourceError::Http { status, body });
        }

        Ok(RecordIter::new(response))
    }
}

/// Iterates decoded events from a blocking byte stream, one JSON record per
/// line. An I/O fault ends the iteration after yielding the error once.
#[derive(Debug)]
pub struct RecordIter<R> {
    reader: R,
    buffer: Vec<u8>,
    done: bool,
}

impl<R: Read> RecordIter<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            done: false,
        }
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        memchr(b'\n', &self.buffer).map(|pos| {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            line
        })
    }
}

impl<R: Read> Iterator for RecordIter<R> {
    type Item = Result<AnalysisEvent, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            while let Some(line) = self.next_line() {
                if let Some(event) = decode_record(&line) {
                    return Some(Ok(event));
                }
            }

            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.done = true;
                    // The last line of the body may arrive without a newline.
                    let trailing = std::mem::take(&mut self.buffer);
                    return decode_record(&trailing).map(Ok);
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(SourceError::Read(err)));
                }
            }
        }
    }
}

/// Decode one line of the stream. Blank lines and malformed records yield
/// `None` and the stream keeps going.
fn decode_record(line: &[u8]) -> Option<AnalysisEvent> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(err) => {
            tracing::warn!("skipping invalid UTF-8 in stream: {err}");
            return None;
        }
    };

    if text.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamRecord>(text) {
        Ok(record) => Some(AnalysisEvent::from(record)),
        Err(err) => {
            tracing::warn!("could not parse record: {err} - {text}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::Phase;
    use std::io::{self, Cursor, Write};

    /// Hands out one byte per read to exercise records split across reads.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    /// Yields its data, then fails with a connection reset.
    struct FailingReader {
        inner: Cursor<Vec<u8>>,
        failed: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            if self.failed {
                return Ok(0);
            }
            self.failed = true;
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn events_from(input: &str) -> Vec<AnalysisEvent> {
        RecordIter::new(Cursor::new(input.as_bytes().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .expect("no faults")
    }

    fn serve_once(response: String) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        std::thread::spawn(move || {
            if let Ok((mut socket, _)) = listener.accept() {
                // Drain the whole request before answering; responding
                // early can reset the connection under the client.
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            request.extend_from_slice(&buf[..n]);
                            if request_complete(&request) {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let _ = socket.write_all(response.as_bytes());
                let _ = socket.flush();
            }
        });
        format!("http://{addr}/analyze")
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]);
        let content_length = headers
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.local_addr().expect("local addr").port()
    }

    #[test]
    fn decodes_one_record_per_line() {
        let events = events_from(
            "{\"event\":\"status\",\"body\":\"started\"}\n{\"event\":\"content\",\"body\":\"done\"}\n",
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, Phase::Status);
        assert_eq!(events[0].body, "started");
        assert_eq!(events[1].phase, Phase::Content);
        assert_eq!(events[1].body, "done");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let events = events_from(concat!(
            "{\"event\":\"status\",\"body\":\"one\"}\n",
            "not json at all\n",
            "{\"event\":\"status\",\"body\":\"two\"}\n",
            "{\"truncated\": \n",
            "{\"event\":\"content\",\"body\":\"three\"}\n",
        ));

        let bodies: Vec<_> = events.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, ["one", "two", "three"]);
    }

    #[test]
    fn records_without_event_key_are_skipped() {
        let events = events_from("{\"body\":\"untagged\"}\n{\"event\":\"status\",\"body\":\"ok\"}\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].body, "ok");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let events = events_from("\n\n{\"event\":\"status\",\"body\":\"ok\"}\n\n");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn records_split_across_reads_are_reassembled() {
        let data =
            "{\"event\":\"status\",\"body\":\"slow\"}\n{\"event\":\"content\",\"body\":\"done\"}\n";
        let events: Vec<_> = RecordIter::new(TrickleReader {
            data: data.as_bytes().to_vec(),
            pos: 0,
        })
        .collect::<Result<Vec<_>, _>>()
        .expect("no faults");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].body, "slow");
        assert_eq!(events[1].body, "done");
    }

    #[test]
    fn trailing_line_without_newline_is_decoded() {
        let events = events_from("{\"event\":\"content\",\"body\":\"done\"}");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, Phase::Content);
    }

    #[test]
    fn read_failure_surfaces_as_source_error() {
        let mut iter = RecordIter::new(FailingReader {
            inner: Cursor::new(b"{\"event\":\"status\",\"body\":\"one\"}\n".to_vec()),
            failed: false,
        });

        let first = iter.next().expect("first item").expect("first event");
        assert_eq!(first.body, "one");

        let fault = iter.next().expect("fault item");
        assert!(matches!(fault, Err(SourceError::Read(_))));

        assert!(iter.next().is_none());
    }

    #[test]
    fn streams_events_from_a_live_socket() {
        let body =
            "{\"event\":\"status\",\"body\":\"started\"}\n{\"event\":\"content\",\"body\":\"done\"}\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let endpoint = serve_once(response);

        let source = HttpEventSource::new(endpoint).expect("client");
        let request = AnalyzeRequest {
            text: "OTT-90829".to_string(),
            files: vec![],
        };
        let events: Vec<_> = source
            .open(&request)
            .expect("open stream")
            .collect::<Result<Vec<_>, _>>()
            .expect("no faults");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, Phase::Status);
        assert_eq!(events[0].body, "started");
        assert_eq!(events[1].phase, Phase::Content);
        assert_eq!(events[1].body, "done");
    }

    #[test]
    fn non_success_status_is_a_transport_fault() {
        let response = "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 9\r\nconnection: close\r\n\r\nanalyzer!".to_string();
        let endpoint = serve_once(response);

        let source = HttpEventSource::new(endpoint).expect("client");
        let request = AnalyzeRequest {
            text: "OTT-90829".to_string(),
            files: vec![],
        };

        let err = source.open(&request).expect_err("http error");
        match err {
            SourceError::Http { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "analyzer!");
            }
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[test]
    fn connection_failure_has_a_friendly_message() {
        let port = unused_port();
        let source =
            HttpEventSource::new(format!("http://127.0.0.1:{port}/analyze")).expect("client");
        let request = AnalyzeRequest {
            text: "OTT-90829".to_string(),
            files: vec![],
        };

        let err = source.open(&request).expect_err("refused");
        assert!(matches!(err, SourceError::Connect(_)));
        assert_eq!(err.to_string(), "Connection failed. Is the server running?");
    }
}
