//! GitHub REST v3 implementation of `HostingApi`.
//!
//! Endpoints used:
//!   * GET   /repos/{owner}/{repo}/pulls/{number}/files
//!   * POST  /repos/{owner}/{repo}/git/blobs
//!   * GET   /repos/{owner}/{repo}/git/ref/{ref}
//!   * GET   /repos/{owner}/{repo}/git/commits/{sha}
//!   * POST  /repos/{owner}/{repo}/git/trees
//!   * POST  /repos/{owner}/{repo}/git/commits
//!   * PATCH /repos/{owner}/{repo}/git/refs/{ref}
//!   * POST  /repos/{owner}/{repo}/pulls/{number}/reviews

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::types::{PullRequestFile, ReviewEvent, TreeEntry};
use super::{GitHubError, HostingApi};
use crate::config::Config;
use crate::event::RepoId;

const USER_AGENT: &str = "pr-autocommit";
const PER_PAGE: usize = 100;

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
    token: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_api", &self.base_api)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Deserialize)]
struct GitCommitResponse {
    tree: ShaResponse,
}

#[derive(Deserialize)]
struct ReviewResponse {
    id: u64,
}

#[derive(Serialize)]
struct NewBlob<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct NewTree<'a> {
    base_tree: &'a str,
    tree: &'a [TreeEntry],
}

#[derive(Serialize)]
struct NewCommit<'a> {
    message: &'a str,
    tree: &'a str,
    parents: [&'a str; 1],
}

#[derive(Serialize)]
struct RefUpdate<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct NewReview<'a> {
    body: &'a str,
    event: ReviewEvent,
}

impl GitHubClient {
    /// Build a client from configuration. Fails before any request is made
    /// when no token is configured.
    pub fn new(config: &Config) -> Result<Self, GitHubError> {
        let token = config.github_token()?.to_string();
        debug!(base_api = %config.api_url(), "creating GitHub client");
        Ok(Self {
            http: Client::new(),
            base_api: config.api_url().to_string(),
            token,
        })
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_api, repo.owner, repo.name, path
        )
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn pull_request_files(
        &self,
        repo: &RepoId,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        let url = self.repo_url(repo, &format!("pulls/{}/files", pr_number));
        let mut files = Vec::new();
        let mut page = 1;
        loop {
            debug!(page, "fetching PR files");
            let batch: Vec<PullRequestFile> = self
                .authed(self.http.get(&url))
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let done = batch.len() < PER_PAGE;
            files.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        Ok(files)
    }

    #[instrument(skip(self, repo, content), fields(repo = %repo, bytes = content.len()))]
    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: &str,
    ) -> Result<String, GitHubError> {
        let resp: ShaResponse = self
            .authed(self.http.post(self.repo_url(repo, "git/blobs")))
            .json(&NewBlob { content, encoding })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(sha = %resp.sha, "created blob");
        Ok(resp.sha)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn ref_sha(&self, repo: &RepoId, reference: &str) -> Result<String, GitHubError> {
        let resp: RefResponse = self
            .authed(
                self.http
                    .get(self.repo_url(repo, &format!("git/ref/{}", reference))),
            )
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.object.sha)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn commit_tree_sha(
        &self,
        repo: &RepoId,
        commit_sha: &str,
    ) -> Result<String, GitHubError> {
        let resp: GitCommitResponse = self
            .authed(
                self.http
                    .get(self.repo_url(repo, &format!("git/commits/{}", commit_sha))),
            )
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.tree.sha)
    }

    #[instrument(skip(self, repo, entries), fields(repo = %repo, entries = entries.len()))]
    async fn create_tree(
        &self,
        repo: &RepoId,
        entries: &[TreeEntry],
        base_tree: &str,
    ) -> Result<String, GitHubError> {
        let resp: ShaResponse = self
            .authed(self.http.post(self.repo_url(repo, "git/trees")))
            .json(&NewTree {
                base_tree,
                tree: entries,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.sha)
    }

    #[instrument(skip(self, repo, message), fields(repo = %repo))]
    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String, GitHubError> {
        let resp: ShaResponse = self
            .authed(self.http.post(self.repo_url(repo, "git/commits")))
            .json(&NewCommit {
                message,
                tree: tree_sha,
                parents: [parent_sha],
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.sha)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn update_ref(
        &self,
        repo: &RepoId,
        reference: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        self.authed(
            self.http
                .patch(self.repo_url(repo, &format!("git/refs/{}", reference))),
        )
        .json(&RefUpdate { sha, force: false })
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }

    #[instrument(skip(self, repo, body), fields(repo = %repo))]
    async fn create_pull_request_review(
        &self,
        repo: &RepoId,
        pr_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> Result<u64, GitHubError> {
        let resp: ReviewResponse = self
            .authed(
                self.http
                    .post(self.repo_url(repo, &format!("pulls/{}/reviews", pr_number))),
            )
            .json(&NewReview { body, event })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.id)
    }
}
