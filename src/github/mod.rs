pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::GitHubClient;
pub use types::{PullRequestFile, ReviewEvent, TreeEntry};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ConfigError;
use crate::event::RepoId;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// The remote operations the workflow needs from the hosting service.
///
/// Implementations pass straight through to the remote API: no retries,
/// no local validation. `reference` arguments are of the form `heads/<branch>`.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn pull_request_files(
        &self,
        repo: &RepoId,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, GitHubError>;

    /// Upload file content; returns the blob sha.
    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: &str,
    ) -> Result<String, GitHubError>;

    /// Commit sha a ref currently points at.
    async fn ref_sha(&self, repo: &RepoId, reference: &str) -> Result<String, GitHubError>;

    /// Tree sha of a commit.
    async fn commit_tree_sha(&self, repo: &RepoId, commit_sha: &str)
        -> Result<String, GitHubError>;

    async fn create_tree(
        &self,
        repo: &RepoId,
        entries: &[TreeEntry],
        base_tree: &str,
    ) -> Result<String, GitHubError>;

    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String, GitHubError>;

    async fn update_ref(&self, repo: &RepoId, reference: &str, sha: &str)
        -> Result<(), GitHubError>;

    /// Post a review; returns the review id.
    async fn create_pull_request_review(
        &self,
        repo: &RepoId,
        pr_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> Result<u64, GitHubError>;
}
