use crate::api::StreamRecord;

/// Discriminant of one streamed analysis event.
///
/// The wire carries free-form phase names; the well-known ones get their
/// own variants and anything else round-trips through [`Phase::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Status,
    Content,
    Warning,
    Error,
    Other(String),
}

impl Phase {
    pub fn from_name(name: &str) -> Self {
        match name {
            "status" => Phase::Status,
            "content" => Phase::Content,
            "warning" => Phase::Warning,
            "error" => Phase::Error,
            other => Phase::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Phase::Status => "status",
            Phase::Content => "content",
            Phase::Warning => "warning",
            Phase::Error => "error",
            Phase::Other(name) => name,
        }
    }
}

impl AsRef<str> for Phase {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One decoded unit of the streamed analysis response. Immutable once
/// produced; ordering within a stream is significant.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEvent {
    pub phase: Phase,
    pub body: String,
}

impl AnalysisEvent {
    pub fn new(phase: Phase, body: impl Into<String>) -> Self {
        Self {
            phase,
            body: body.into(),
        }
    }

    /// The shape the bridge synthesizes when the producer faults.
    pub fn error(body: impl Into<String>) -> Self {
        Self::new(Phase::Error, body)
    }

    /// `content` marks the final payload of the whole exchange; every other
    /// phase is an intermediate step.
    pub fn is_final(&self) -> bool {
        self.phase == Phase::Content
    }

    pub fn is_error(&self) -> bool {
        self.phase == Phase::Error
    }
}

impl From<StreamRecord> for AnalysisEvent {
    fn from(record: StreamRecord) -> Self {
        let StreamRecord {
            event,
            body,
            error,
            status,
            content,
            warning,
        } = record;

        // `body` is canonical; the legacy keys are accepted on input only.
        let body = body
            .or(error)
            .or(status)
            .or(content)
            .or(warning)
            .unwrap_or_default();

        Self {
            phase: Phase::from_name(&event),
            body,
        }
    }
}
