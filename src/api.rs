use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone)]
pub struct AnalyzeRequest {
    pub text: String,
    pub files: Vec<String>,
}

/// Raw wire record, one per line of the streamed response body.
///
/// Only `event` is required. The service is not consistent about which key
/// carries the payload: phase records use `body`, fault records use `error`,
/// and older builds mirrored the phase name into its own key. All of them
/// are accepted here; [`crate::core::event::AnalysisEvent`] unifies them.
#[derive(Debug, Deserialize)]
pub struct StreamRecord {
    pub event: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}
