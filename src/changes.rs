use std::path::PathBuf;
use tracing::{debug, instrument, warn};

use crate::process::{Executor, ProcessError};

/// Porcelain v1 status of tracked files only.
pub const STATUS_COMMAND: &str = "git status --porcelain=1 --untracked-files=no";

/// Absolute path of the repository root; porcelain paths are relative to it.
pub const TOPLEVEL_COMMAND: &str = "git rev-parse --show-toplevel";

/// List tracked files with uploadable local changes.
///
/// The exit status of the status command is ignored; only its output counts.
#[instrument(skip(executor))]
pub async fn modified_files(executor: &dyn Executor) -> Result<Vec<String>, ProcessError> {
    let output = executor.execute(STATUS_COMMAND).await?;
    if !output.success() {
        debug!(status = ?output.status, stderr = %output.stderr.trim(), "status command exited non-zero");
    }
    Ok(parse_status(&output.stdout))
}

/// Root of the working tree the executor runs in, or None when git cannot
/// report one (not a repository, git missing).
#[instrument(skip(executor))]
pub async fn repo_root(executor: &dyn Executor) -> Result<Option<PathBuf>, ProcessError> {
    let output = executor.execute(TOPLEVEL_COMMAND).await?;
    let root = output.stdout.trim();
    if !output.success() || root.is_empty() {
        debug!(status = ?output.status, "could not resolve repository root");
        return Ok(None);
    }
    Ok(Some(PathBuf::from(root)))
}

/// Parse `git status --porcelain=1` output into paths.
///
/// Each line is `XY <path>`. Entries whose index or worktree column is
/// `M`, `A` or `T` are kept with the status prefix removed. Deletions
/// (in either column), renames and copies have no local content to upload
/// and are skipped.
pub fn parse_status(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (status, path) = split_status_line(line)?;
            if status.chars().any(|c| matches!(c, 'M' | 'A' | 'T'))
                && !is_rename(status)
                && !is_deleted_on_disk(status)
            {
                Some(unquote(path))
            } else {
                warn!(status, path, "skipping change that cannot be uploaded");
                None
            }
        })
        .collect()
}

fn split_status_line(line: &str) -> Option<(&str, &str)> {
    if line.len() < 4 || !line.is_char_boundary(2) || line.as_bytes()[2] != b' ' {
        if !line.trim().is_empty() {
            debug!(line, "ignoring malformed status line");
        }
        return None;
    }
    let path = &line[3..];
    if path.is_empty() {
        return None;
    }
    Some((&line[..2], path))
}

fn is_rename(status: &str) -> bool {
    status.contains('R') || status.contains('C')
}

/// `AD` / `MD`: staged, then removed from the working tree.
fn is_deleted_on_disk(status: &str) -> bool {
    status.as_bytes()[1] == b'D'
}

/// Decode a path as git prints it. Paths with special or non-ASCII bytes
/// are wrapped in quotes with C-style escapes (`\t`, `\"`, `\\`, `\303`).
fn unquote(path: &str) -> String {
    let inner = match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => inner,
        None => return path.to_string(),
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next() {
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'n') => bytes.push(b'\n'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'v') => bytes.push(0x0b),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8(bytes).unwrap_or_else(|err| {
        warn!(path, "quoted path is not valid UTF-8");
        String::from_utf8_lossy(err.as_bytes()).into_owned()
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Executor with canned stdout per command. Unknown commands exit 1
    /// with no output. Records the commands it was given.
    pub(crate) struct CannedExecutor {
        responses: HashMap<String, String>,
        pub(crate) commands: Mutex<Vec<String>>,
    }

    impl CannedExecutor {
        /// Answers the status command with `status_stdout`.
        pub(crate) fn new(status_stdout: &str) -> Self {
            let mut responses = HashMap::new();
            responses.insert(STATUS_COMMAND.to_string(), status_stdout.to_string());
            Self {
                responses,
                commands: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_toplevel(mut self, root: &std::path::Path) -> Self {
            self.responses.insert(
                TOPLEVEL_COMMAND.to_string(),
                format!("{}\n", root.display()),
            );
            self
        }
    }

    #[async_trait]
    impl Executor for CannedExecutor {
        async fn execute(&self, command: &str) -> Result<CommandOutput, ProcessError> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(match self.responses.get(command) {
                Some(stdout) => CommandOutput {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                    status: Some(0),
                },
                None => CommandOutput {
                    stdout: String::new(),
                    stderr: "unknown command".to_string(),
                    status: Some(1),
                },
            })
        }
    }

    #[test]
    fn test_status_line_table() {
        let cases: &[(&str, Option<&str>)] = &[
            (" M file2.txt", Some("file2.txt")),
            ("M  staged.txt", Some("staged.txt")),
            ("MM both.txt", Some("both.txt")),
            ("A  added.txt", Some("added.txt")),
            ("AM added_then_edited.txt", Some("added_then_edited.txt")),
            (" T link", Some("link")),
            (" D removed.txt", None),
            ("D  staged_removal.txt", None),
            ("AD gone_a.txt", None),
            ("MD gone_m.txt", None),
            ("R  old.txt -> new.txt", None),
            ("RM old.txt -> new.txt", None),
            ("C  a.txt -> b.txt", None),
            (" M \"dir with space/file.txt\"", Some("dir with space/file.txt")),
            (" M \"caf\\303\\251.txt\"", Some("café.txt")),
            (" M \"tab\\there.txt\"", Some("tab\there.txt")),
            (" M \"say \\\"hi\\\".txt\"", Some("say \"hi\".txt")),
            (" M \"back\\\\slash.txt\"", Some("back\\slash.txt")),
            ("", None),
            ("M", None),
        ];
        for (line, expected) in cases {
            let parsed = parse_status(line);
            let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
            assert_eq!(parsed, expected, "status line {:?}", line);
        }
    }

    #[test]
    fn test_deleted_on_disk_entries_do_not_hide_others() {
        let output = "AD gone_a.txt\nMD gone_m.txt\n M kept.txt\n";
        assert_eq!(parse_status(output), vec!["kept.txt"]);
    }

    #[test]
    fn test_parse_multiline_output_keeps_order() {
        let output = " M src/main.rs\n D gone.rs\nM  Cargo.toml\n";
        assert_eq!(parse_status(output), vec!["src/main.rs", "Cargo.toml"]);
    }

    #[test]
    fn test_no_output_means_no_files() {
        assert!(parse_status("").is_empty());
    }

    #[tokio::test]
    async fn test_modified_files_runs_status_command() {
        let executor = CannedExecutor::new(" M a.txt\n M b.txt\n");
        let files = modified_files(&executor).await.unwrap();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
        assert_eq!(
            *executor.commands.lock().unwrap(),
            vec![STATUS_COMMAND.to_string()]
        );
    }

    #[tokio::test]
    async fn test_repo_root_trims_output() {
        let executor = CannedExecutor::new("").with_toplevel(std::path::Path::new("/work/repo"));
        let root = repo_root(&executor).await.unwrap();
        assert_eq!(root, Some(PathBuf::from("/work/repo")));
    }

    #[tokio::test]
    async fn test_repo_root_outside_repository_is_none() {
        let executor = CannedExecutor::new("");
        assert_eq!(repo_root(&executor).await.unwrap(), None);
    }
}
