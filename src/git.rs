use tracing::info;

use crate::error::{Result, UpsertError};
use crate::process::{
    args, command_failed, run_checked, run_stdout, CommandRunner, SystemRunner,
};
use crate::types::{Commit, Diff, User};

/// Separates the fields of one commit in `git log` output.
const FIELD_SEP: char = '\u{1f}';

/// Queries and mutations the upsert engine needs from source control.
///
/// Ranges are lists of revision arguments in `git log` syntax, e.g.
/// `["feature", "^origin/main"]`.
pub trait SourceControl {
    /// Name of the checked-out local branch.
    fn current_branch(&self) -> Result<String>;

    /// Sha of `remote/branch` as last fetched, or `None` if there is no such
    /// remote-tracking branch.
    fn remote_head(&self, remote: &str, branch: &str) -> Result<Option<String>>;

    fn branch_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        Ok(self.remote_head(remote, branch)?.is_some())
    }

    fn diff(&self, range: &[String]) -> Result<Diff>;

    /// Commits in `range`, most recent first. Every ref in `range` must exist.
    fn log(&self, range: &[String]) -> Result<Vec<Commit>>;

    /// Shas of merge commits in `range`.
    fn merge_commits(&self, range: &[String]) -> Result<Vec<String>>;

    /// Identity from `user.name` / `user.email`.
    fn configured_user(&self) -> Result<User>;

    /// Subject and body of the last commit on `rev`.
    fn last_commit_message(&self, rev: &str) -> Result<(String, String)>;

    /// Force-push `local_branch` to `remote_branch` on `remote`, but only if
    /// the remote branch is still at `expected_remote_head` (`None` meaning
    /// it must not exist yet).
    fn push(
        &self,
        remote: &str,
        local_branch: &str,
        remote_branch: &str,
        expected_remote_head: Option<&str>,
    ) -> Result<()>;
}

/// [`SourceControl`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct Git<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> Git<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn run(&self, git_args: Vec<String>) -> Result<String> {
        run_stdout(&self.runner, "git", &git_args)
    }
}

impl<R: CommandRunner> SourceControl for Git<R> {
    fn current_branch(&self) -> Result<String> {
        let git_args = args(["symbolic-ref", "--quiet", "--short", "HEAD"]);
        let output = self.runner.execute("git", &git_args)?;
        match output.status {
            0 => Ok(output.stdout.trim().to_string()),
            1 => Err(UpsertError::DetachedHead),
            _ => Err(command_failed("git", &git_args, output)),
        }
    }

    fn remote_head(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let git_args = args([
            "rev-parse".to_string(),
            "--verify".to_string(),
            "--quiet".to_string(),
            format!("refs/remotes/{}/{}^{{commit}}", remote, branch),
        ]);
        let output = self.runner.execute("git", &git_args)?;
        match output.status {
            0 => Ok(Some(output.stdout.trim().to_string())),
            // --verify --quiet exits 1 for a ref that doesn't exist.
            1 => Ok(None),
            _ => Err(command_failed("git", &git_args, output)),
        }
    }

    fn diff(&self, range: &[String]) -> Result<Diff> {
        let mut git_args = args(["diff"]);
        git_args.extend_from_slice(range);
        let output = run_checked(&self.runner, "git", &git_args)?;
        Ok(Diff::new(output.stdout))
    }

    fn log(&self, range: &[String]) -> Result<Vec<Commit>> {
        let mut git_args = args([
            "log".to_string(),
            format!("--format=%H{0}%an{0}%ae{0}%cn{0}%ce", FIELD_SEP),
        ]);
        git_args.extend_from_slice(range);
        let stdout = self.run(git_args)?;

        stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(parse_commit_line)
            .collect()
    }

    fn merge_commits(&self, range: &[String]) -> Result<Vec<String>> {
        let mut git_args = args(["log", "--merges", "--format=%H"]);
        git_args.extend_from_slice(range);
        let stdout = self.run(git_args)?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn configured_user(&self) -> Result<User> {
        let name = self.run(args(["config", "--get", "user.name"]))?;
        let email = self.run(args(["config", "--get", "user.email"]))?;
        Ok(User { name, email })
    }

    fn last_commit_message(&self, rev: &str) -> Result<(String, String)> {
        let subject = self.run(args(["log", "-1", "--format=%s", rev]))?;
        let body = self.run(args(["log", "-1", "--format=%b", rev]))?;
        Ok((subject, body))
    }

    fn push(
        &self,
        remote: &str,
        local_branch: &str,
        remote_branch: &str,
        expected_remote_head: Option<&str>,
    ) -> Result<()> {
        info!(remote, local_branch, remote_branch, "force-pushing with lease");
        self.run(vec![
            "push".to_string(),
            format!(
                "--force-with-lease=refs/heads/{}:{}",
                remote_branch,
                expected_remote_head.unwrap_or("")
            ),
            remote.to_string(),
            format!("{}:{}", local_branch, remote_branch),
        ])?;
        Ok(())
    }
}

fn parse_commit_line(line: &str) -> Result<Commit> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    match fields.as_slice() {
        [sha, author_name, author_email, committer_name, committer_email] => Ok(Commit {
            sha: sha.to_string(),
            author: User::new(*author_name, *author_email),
            committer: User::new(*committer_name, *committer_email),
        }),
        _ => Err(UpsertError::Command {
            command: "git log".to_string(),
            status: 0,
            stdout: line.to_string(),
            stderr: "unexpected `git log` output".to_string(),
        }),
    }
}
