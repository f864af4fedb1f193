use serde::{Deserialize, Serialize};

/// File mode for regular, non-executable files.
pub const REGULAR_FILE_MODE: &str = "100644";

/// One entry of a tree to create: a path pointing at an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            kind: "blob".to_string(),
            sha: sha.into(),
        }
    }
}

/// A file touched by a pull request, as listed by the pulls/files endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
}

/// Review action posted with a pull-request review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    RequestChanges,
}

impl std::fmt::Display for ReviewEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewEvent::RequestChanges => write!(f, "REQUEST_CHANGES"),
        }
    }
}
