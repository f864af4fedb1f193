//! In-memory `HostingApi` that records every call, for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::types::{PullRequestFile, ReviewEvent, TreeEntry};
use super::{GitHubError, HostingApi};
use crate::event::RepoId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PullRequestFiles { pr_number: u64 },
    CreateBlob { content: String, encoding: String },
    RefSha { reference: String },
    CommitTreeSha { commit_sha: String },
    CreateTree { entries: Vec<TreeEntry>, base_tree: String },
    CreateCommit { message: String, tree_sha: String, parent_sha: String },
    UpdateRef { reference: String, sha: String },
    CreateReview { pr_number: u64, body: String, event: ReviewEvent },
}

/// Returns deterministic shas: `blob-N` for the Nth blob, `latest-commit`,
/// `base-tree`, `new-tree` and `new-commit` for the chain.
#[derive(Debug, Default)]
pub struct FakeHostingApi {
    calls: Mutex<Vec<(RepoId, Call)>>,
    pr_files: Vec<String>,
}

impl FakeHostingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pr_files(files: &[&str]) -> Self {
        Self {
            calls: Mutex::default(),
            pr_files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn repos(&self) -> Vec<RepoId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(repo, _)| repo.clone())
            .collect()
    }

    fn record(&self, repo: &RepoId, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push((repo.clone(), call));
        calls
            .iter()
            .filter(|(_, c)| matches!(c, Call::CreateBlob { .. }))
            .count()
    }
}

#[async_trait]
impl HostingApi for FakeHostingApi {
    async fn pull_request_files(
        &self,
        repo: &RepoId,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        self.record(repo, Call::PullRequestFiles { pr_number });
        Ok(self
            .pr_files
            .iter()
            .map(|f| PullRequestFile {
                filename: f.clone(),
            })
            .collect())
    }

    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: &str,
    ) -> Result<String, GitHubError> {
        let n = self.record(
            repo,
            Call::CreateBlob {
                content: content.to_string(),
                encoding: encoding.to_string(),
            },
        );
        Ok(format!("blob-{}", n))
    }

    async fn ref_sha(&self, repo: &RepoId, reference: &str) -> Result<String, GitHubError> {
        self.record(
            repo,
            Call::RefSha {
                reference: reference.to_string(),
            },
        );
        Ok("latest-commit".to_string())
    }

    async fn commit_tree_sha(
        &self,
        repo: &RepoId,
        commit_sha: &str,
    ) -> Result<String, GitHubError> {
        self.record(
            repo,
            Call::CommitTreeSha {
                commit_sha: commit_sha.to_string(),
            },
        );
        Ok("base-tree".to_string())
    }

    async fn create_tree(
        &self,
        repo: &RepoId,
        entries: &[TreeEntry],
        base_tree: &str,
    ) -> Result<String, GitHubError> {
        self.record(
            repo,
            Call::CreateTree {
                entries: entries.to_vec(),
                base_tree: base_tree.to_string(),
            },
        );
        Ok("new-tree".to_string())
    }

    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String, GitHubError> {
        self.record(
            repo,
            Call::CreateCommit {
                message: message.to_string(),
                tree_sha: tree_sha.to_string(),
                parent_sha: parent_sha.to_string(),
            },
        );
        Ok("new-commit".to_string())
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        reference: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        self.record(
            repo,
            Call::UpdateRef {
                reference: reference.to_string(),
                sha: sha.to_string(),
            },
        );
        Ok(())
    }

    async fn create_pull_request_review(
        &self,
        repo: &RepoId,
        pr_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> Result<u64, GitHubError> {
        self.record(
            repo,
            Call::CreateReview {
                pr_number,
                body: body.to_string(),
                event,
            },
        );
        Ok(1)
    }
}
