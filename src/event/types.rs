use serde::Deserialize;

/// The subset of a GitHub Actions event payload this tool reads.
///
/// Every section is optional so that push or workflow_dispatch payloads
/// still parse; accessors on `Event` report what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    pub repository: Option<Repository>,
    pub pull_request: Option<PullRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: Option<String>,
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: Option<u64>,
    pub head: Option<Head>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Head {
    pub r#ref: Option<String>,
}

/// A repository identifier, displayed as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
