use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::event::RepoId;
use crate::github::{GitHubError, HostingApi, TreeEntry};

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// The shas produced by one commit, in the order they were created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitChain {
    pub latest_commit: String,
    pub base_tree: String,
    pub new_tree: String,
    pub new_commit: String,
}

/// Upload each file under `workdir` as a base64 blob, in order.
///
/// Stops at the first unreadable file. Blobs already uploaded stay on the
/// remote; they are unreferenced and harmless.
#[instrument(skip(api, repo, files), fields(repo = %repo, files = files.len()))]
pub async fn create_blobs(
    api: &dyn HostingApi,
    repo: &RepoId,
    workdir: &Path,
    files: &[String],
) -> Result<Vec<TreeEntry>, CommitError> {
    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let path = workdir.join(file);
        let content = tokio::fs::read(&path).await.map_err(|source| CommitError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let sha = api
            .create_blob(repo, &STANDARD.encode(content), "base64")
            .await?;
        debug!(file = %file, sha = %sha, "uploaded blob");
        entries.push(TreeEntry::blob(file.as_str(), sha));
    }
    Ok(entries)
}

/// Commit `files` on top of `branch` through the API and move the branch.
///
/// Each step consumes the previous step's sha; any failure aborts the rest.
#[instrument(skip(api, repo, files, message), fields(repo = %repo, files = files.len()))]
pub async fn commit_files(
    api: &dyn HostingApi,
    repo: &RepoId,
    workdir: &Path,
    branch: &str,
    files: &[String],
    message: &str,
) -> Result<CommitChain, CommitError> {
    let reference = format!("heads/{}", branch);

    let latest_commit = api.ref_sha(repo, &reference).await?;
    let base_tree = api.commit_tree_sha(repo, &latest_commit).await?;
    debug!(latest_commit = %latest_commit, base_tree = %base_tree, "resolved branch head");

    let entries = create_blobs(api, repo, workdir, files).await?;
    let new_tree = api.create_tree(repo, &entries, &base_tree).await?;
    let new_commit = api
        .create_commit(repo, message, &new_tree, &latest_commit)
        .await?;
    api.update_ref(repo, &reference, &new_commit).await?;
    info!(new_commit = %new_commit, reference = %reference, "updated branch");

    Ok(CommitChain {
        latest_commit,
        base_tree,
        new_tree,
        new_commit,
    })
}
