use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::changes;
use crate::commit::{self, CommitChain, CommitError};
use crate::event::{Event, EventError, RepoId};
use crate::github::{GitHubError, HostingApi, ReviewEvent};
use crate::process::{Executor, ProcessError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// How a run ended. `main` turns this into the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Working tree was clean; nothing was sent.
    Clean,
    Committed { chain: CommitChain, files: Vec<String> },
    /// Changes were requested on the pull request. The run must fail.
    Rejected { pr_number: u64 },
}

impl Outcome {
    pub fn exit_status(&self) -> u8 {
        match self {
            Outcome::Rejected { .. } => 1,
            Outcome::Clean | Outcome::Committed { .. } => 0,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// One CI run against one pull request.
pub struct Workflow<'a> {
    event: Event,
    repo: RepoId,
    api: &'a dyn HostingApi,
    executor: &'a dyn Executor,
    workdir: PathBuf,
}

impl<'a> Workflow<'a> {
    pub fn new(
        event: Event,
        api: &'a dyn HostingApi,
        executor: &'a dyn Executor,
        workdir: impl Into<PathBuf>,
    ) -> Result<Self, WorkflowError> {
        let repo = event.repo()?;
        Ok(Self {
            event,
            repo,
            api,
            executor,
            workdir: workdir.into(),
        })
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Commit every modified tracked file to the PR branch, if there are any.
    #[instrument(skip(self, message), fields(repo = %self.repo))]
    pub async fn commit_changes(&self, message: &str) -> Result<Outcome, WorkflowError> {
        let files = changes::modified_files(self.executor).await?;
        if files.is_empty() {
            info!("working tree clean, nothing to commit");
            return Ok(Outcome::Clean);
        }

        info!("Committing changes to:\n  {}", files.join("\n  "));
        let branch = self.event.branch()?;
        let root = changes::repo_root(self.executor)
            .await?
            .unwrap_or_else(|| self.workdir.clone());
        debug!(root = %root.display(), "reading changed files");
        let chain =
            commit::commit_files(self.api, &self.repo, &root, branch, &files, message).await?;
        Ok(Outcome::Committed { chain, files })
    }

    /// Post a "request changes" review with `message` as its body.
    #[instrument(skip(self, message), fields(repo = %self.repo))]
    pub async fn reject_pr(&self, message: &str) -> Result<Outcome, WorkflowError> {
        let pr_number = self.event.pr_number()?;
        info!("Requesting changes...");
        info!("{}", message);

        self.api
            .create_pull_request_review(&self.repo, pr_number, message, ReviewEvent::RequestChanges)
            .await?;
        Ok(Outcome::Rejected { pr_number })
    }

    /// File names touched by the pull request, sorted and de-duplicated.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn files_in_pr(&self) -> Result<Vec<String>, WorkflowError> {
        let pr_number = self.event.pr_number()?;
        let mut files: Vec<String> = self
            .api
            .pull_request_files(&self.repo, pr_number)
            .await?
            .into_iter()
            .map(|f| f.filename)
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }
}
