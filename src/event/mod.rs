pub mod types;

pub use types::{Event, RepoId};

use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{Config, ConfigError};

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read event file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse event file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Event payload has no `{0}` field; is this a pull_request run?")]
    MissingField(&'static str),
}

impl Event {
    /// Read and parse the event document named by GITHUB_EVENT_PATH.
    ///
    /// The file is read exactly once; the returned value is held for the
    /// rest of the run. Nothing is touched on disk when the path is unset.
    #[instrument(skip(config))]
    pub fn load(config: &Config) -> Result<Event, EventError> {
        let path = config.event_path()?;
        debug!(path = %path.display(), "reading event document");
        let contents = std::fs::read_to_string(path).map_err(|source| EventError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Event, EventError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `owner/name` of the repository the event belongs to.
    pub fn repo(&self) -> Result<RepoId, EventError> {
        let repository = self
            .repository
            .as_ref()
            .ok_or(EventError::MissingField("repository"))?;
        let name = repository
            .name
            .clone()
            .ok_or(EventError::MissingField("repository.name"))?;
        let owner = repository
            .owner
            .as_ref()
            .and_then(|o| o.login.clone())
            .ok_or(EventError::MissingField("repository.owner.login"))?;
        Ok(RepoId { owner, name })
    }

    pub fn pr_number(&self) -> Result<u64, EventError> {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.number)
            .ok_or(EventError::MissingField("pull_request.number"))
    }

    /// Head branch of the pull request.
    pub fn branch(&self) -> Result<&str, EventError> {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.head.as_ref())
            .and_then(|head| head.r#ref.as_deref())
            .ok_or(EventError::MissingField("pull_request.head.ref"))
    }
}
