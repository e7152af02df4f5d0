//! Test doubles and factories shared across modules.
//!
//! - [`ScriptedRunner`] replays canned subprocess output and records argv,
//!   for testing the `git`/`gh` gateways.
//! - [`FakeSourceControl`] and [`FakeHost`] stand in for the gateways
//!   themselves and record every call, for testing the upsert engine.
//! - [`GitSandbox`] is a throwaway clone of a bare repository, for running
//!   the real `git` gateway.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;

use crate::error::{Result, UpsertError};
use crate::gh::RepositoryHost;
use crate::git::SourceControl;
use crate::process::{command_line, CommandOutput, CommandRunner};
use crate::types::{Commit, Diff, PrState, PullRequest, Repository, User};

// ============================================================================
// Factories
// ============================================================================

pub fn user(n: usize) -> User {
    User::new(format!("User {}", n), format!("user_{}@example.com", n))
}

pub fn commit(sha: &str, author: &User) -> Commit {
    Commit {
        sha: sha.to_string(),
        author: author.clone(),
        committer: author.clone(),
    }
}

pub fn repository(remote: &str, owner: &str, name: &str) -> Repository {
    Repository {
        remote: remote.to_string(),
        owner: owner.to_string(),
        name: name.to_string(),
        name_with_owner: format!("{}/{}", owner, name),
        default_branch: "main".to_string(),
        url: format!("https://github.com/{}/{}", owner, name),
    }
}

pub fn pull_request(repo: &Repository, base_branch: &str, head_branch: &str, number: u64) -> PullRequest {
    PullRequest {
        base_repo: repo.clone(),
        base_branch: base_branch.to_string(),
        head_repo: repo.clone(),
        head_branch: head_branch.to_string(),
        number,
        url: format!("{}/pull/{}", repo.url, number),
        state: PrState::Open,
    }
}

// ============================================================================
// ScriptedRunner
// ============================================================================

/// Replays queued outputs in order; once the queue is empty every command
/// succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<CommandOutput>>,
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful run printing `stdout`.
    pub fn stdout(self, stdout: &str) -> Self {
        self.responses.borrow_mut().push_back(CommandOutput {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
        self
    }

    /// Queue a failed run.
    pub fn fail(self, status: i32, stdout: &str, stderr: &str) -> Self {
        self.responses.borrow_mut().push_back(CommandOutput {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    /// Every command run so far, rendered as a command line.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(program, args)| command_line(program, args))
            .collect()
    }

    /// The arguments (without the program) of every command run so far.
    pub fn argv(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|(_, args)| args.clone()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((program.to_string(), args.to_vec()));
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(CommandOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}

// ============================================================================
// FakeSourceControl
// ============================================================================

/// Diff returned for any range that hasn't been given one explicitly.
pub const DEFAULT_DIFF: &str = "diff --git a/README b/README\n+hello\n";

/// Sha of the default `origin/main`.
pub const BASE_SHA: &str = "ba5e";

/// In-memory [`SourceControl`] with configurable answers.
///
/// Defaults: the configured user is `user(0)`, the current branch is
/// `feature`, every diff is [`DEFAULT_DIFF`], logs are empty, and the only
/// remote-tracking branch is `origin/main`.
#[derive(Debug)]
pub struct FakeSourceControl {
    calls: RefCell<Vec<String>>,
    current_branch: RefCell<String>,
    user: RefCell<User>,
    remote_heads: RefCell<HashMap<(String, String), String>>,
    diffs: RefCell<HashMap<Vec<String>, Diff>>,
    logs: RefCell<HashMap<Vec<String>, Vec<Commit>>>,
    merges: RefCell<HashMap<Vec<String>, Vec<String>>>,
    fail_diffs: Cell<bool>,
}

impl Default for FakeSourceControl {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSourceControl {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            current_branch: RefCell::new("feature".to_string()),
            user: RefCell::new(user(0)),
            remote_heads: RefCell::new(HashMap::from([(
                ("origin".to_string(), "main".to_string()),
                BASE_SHA.to_string(),
            )])),
            diffs: RefCell::new(HashMap::new()),
            logs: RefCell::new(HashMap::new()),
            merges: RefCell::new(HashMap::new()),
            fail_diffs: Cell::new(false),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that change remote state.
    pub fn pushes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("push "))
            .collect()
    }

    pub fn set_current_branch(&self, branch: &str) {
        *self.current_branch.borrow_mut() = branch.to_string();
    }

    pub fn set_user(&self, user: User) {
        *self.user.borrow_mut() = user;
    }

    pub fn set_remote_head(&self, remote: &str, branch: &str, sha: &str) {
        self.remote_heads
            .borrow_mut()
            .insert((remote.to_string(), branch.to_string()), sha.to_string());
    }

    pub fn remove_remote_head(&self, remote: &str, branch: &str) {
        self.remote_heads
            .borrow_mut()
            .remove(&(remote.to_string(), branch.to_string()));
    }

    pub fn set_diff(&self, range: &[&str], text: &str) {
        self.diffs.borrow_mut().insert(to_range(range), Diff::new(text));
    }

    pub fn set_log(&self, range: &[&str], commits: Vec<Commit>) {
        self.logs.borrow_mut().insert(to_range(range), commits);
    }

    pub fn set_merges(&self, range: &[&str], shas: &[&str]) {
        self.merges
            .borrow_mut()
            .insert(to_range(range), shas.iter().map(|s| s.to_string()).collect());
    }

    pub fn fail_diffs(&self) {
        self.fail_diffs.set(true);
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

fn to_range(range: &[&str]) -> Vec<String> {
    range.iter().map(|s| s.to_string()).collect()
}

impl SourceControl for FakeSourceControl {
    fn current_branch(&self) -> Result<String> {
        self.record("current_branch".to_string());
        Ok(self.current_branch.borrow().clone())
    }

    fn remote_head(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        self.record(format!("remote_head {} {}", remote, branch));
        Ok(self
            .remote_heads
            .borrow()
            .get(&(remote.to_string(), branch.to_string()))
            .cloned())
    }

    fn diff(&self, range: &[String]) -> Result<Diff> {
        self.record(format!("diff {}", range.join(" ")));
        if self.fail_diffs.get() {
            return Err(UpsertError::Command {
                command: format!("git diff {}", range.join(" ")),
                status: 128,
                stdout: String::new(),
                stderr: "fatal: bad revision".to_string(),
            });
        }
        Ok(self
            .diffs
            .borrow()
            .get(range)
            .cloned()
            .unwrap_or_else(|| Diff::new(DEFAULT_DIFF)))
    }

    fn log(&self, range: &[String]) -> Result<Vec<Commit>> {
        self.record(format!("log {}", range.join(" ")));
        Ok(self.logs.borrow().get(range).cloned().unwrap_or_default())
    }

    fn merge_commits(&self, range: &[String]) -> Result<Vec<String>> {
        self.record(format!("merge_commits {}", range.join(" ")));
        Ok(self.merges.borrow().get(range).cloned().unwrap_or_default())
    }

    fn configured_user(&self) -> Result<User> {
        self.record("configured_user".to_string());
        Ok(self.user.borrow().clone())
    }

    fn last_commit_message(&self, rev: &str) -> Result<(String, String)> {
        self.record(format!("last_commit_message {}", rev));
        Ok((
            format!("Last commit on {}", rev),
            "Commit body".to_string(),
        ))
    }

    fn push(
        &self,
        remote: &str,
        local_branch: &str,
        remote_branch: &str,
        expected_remote_head: Option<&str>,
    ) -> Result<()> {
        self.record(format!(
            "push {} {}:{} lease={}",
            remote,
            local_branch,
            remote_branch,
            expected_remote_head.unwrap_or("")
        ));
        Ok(())
    }
}

// ============================================================================
// FakeHost
// ============================================================================

type PrKey = (String, String, String, String);

/// In-memory [`RepositoryHost`] that behaves like a tiny GitHub: created PRs
/// are found by later lookups and closed ones disappear.
#[derive(Debug)]
pub struct FakeHost {
    primary: Repository,
    calls: RefCell<Vec<String>>,
    repositories: RefCell<HashMap<String, Repository>>,
    open: RefCell<HashMap<PrKey, PullRequest>>,
    next_number: Cell<u64>,
}

impl FakeHost {
    /// A host that knows `repo` under its own remote name.
    pub fn new(repo: Repository) -> Self {
        let host = Self {
            primary: repo.clone(),
            calls: RefCell::new(Vec::new()),
            repositories: RefCell::new(HashMap::new()),
            open: RefCell::new(HashMap::new()),
            next_number: Cell::new(100),
        };
        host.add_repository(repo);
        host
    }

    pub fn add_repository(&self, repo: Repository) {
        self.repositories.borrow_mut().insert(repo.remote.clone(), repo);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that create or close pull requests.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("create ") || call.starts_with("close "))
            .collect()
    }

    /// Register an open PR between two branches of the repository given to
    /// [`FakeHost::new`].
    pub fn set_existing_pr(&self, base_branch: &str, head_branch: &str, number: u64) -> PullRequest {
        let pr = pull_request(&self.primary, base_branch, head_branch, number);
        self.insert_open(pr.clone());
        pr
    }

    pub fn insert_open(&self, pr: PullRequest) {
        let key = key(&pr.base_repo, &pr.base_branch, &pr.head_repo, &pr.head_branch);
        self.open.borrow_mut().insert(key, pr);
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

fn key(base_repo: &Repository, base_branch: &str, head_repo: &Repository, head_branch: &str) -> PrKey {
    (
        base_repo.name_with_owner.clone(),
        base_branch.to_string(),
        head_repo.name_with_owner.clone(),
        head_branch.to_string(),
    )
}

impl RepositoryHost for FakeHost {
    fn resolve_repository(&self, remote: &str) -> Result<Repository> {
        self.record(format!("resolve_repository {}", remote));
        self.repositories
            .borrow()
            .get(remote)
            .cloned()
            .ok_or_else(|| UpsertError::Command {
                command: format!("git remote get-url {}", remote),
                status: 2,
                stdout: String::new(),
                stderr: format!("error: No such remote '{}'", remote),
            })
    }

    fn find_open_pull_request(
        &self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
    ) -> Result<Option<PullRequest>> {
        self.record(format!(
            "find {}:{} <- {}:{}",
            base_repo.name_with_owner, base_branch, head_repo.name_with_owner, head_branch
        ));
        Ok(self
            .open
            .borrow()
            .get(&key(base_repo, base_branch, head_repo, head_branch))
            .cloned())
    }

    fn create_pull_request(
        &self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        self.record(format!(
            "create {}:{} <- {}:{} title={} body={}",
            base_repo.name_with_owner, base_branch, head_repo.name_with_owner, head_branch, title, body
        ));
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        let pr = PullRequest {
            base_repo: base_repo.clone(),
            base_branch: base_branch.to_string(),
            head_repo: head_repo.clone(),
            head_branch: head_branch.to_string(),
            number,
            url: format!("{}/pull/{}", base_repo.url, number),
            state: PrState::Open,
        };
        self.insert_open(pr.clone());
        Ok(pr)
    }

    fn close_pull_request(&self, pull_request: &PullRequest, comment: &str) -> Result<()> {
        self.record(format!("close #{} comment={}", pull_request.number, comment));
        self.open.borrow_mut().remove(&key(
            &pull_request.base_repo,
            &pull_request.base_branch,
            &pull_request.head_repo,
            &pull_request.head_branch,
        ));
        Ok(())
    }
}

// ============================================================================
// GitSandbox
// ============================================================================

/// Global mutex for tests that change or depend on the current working
/// directory. The `git` gateway runs in the process cwd, so every test that
/// uses a [`GitSandbox`] holds this for its whole duration.
pub static CWD_MUTEX: Mutex<()> = Mutex::new(());

/// A bare repository standing in for the remote (`origin`), and a clone of
/// it that is the process cwd for as long as the sandbox lives.
///
/// The clone's `user.name`/`user.email` are those of `user(0)`, and `main`
/// has one commit, pushed, so `origin/main` exists.
pub struct GitSandbox {
    root: TempDir,
    pub remote: PathBuf,
    pub work: PathBuf,
    previous_dir: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl GitSandbox {
    pub fn new() -> Self {
        let lock = CWD_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let root = TempDir::new().unwrap();
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");

        run_git(root.path(), &["init", "--quiet", "--bare", "remote.git"]);
        run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(root.path(), &["init", "--quiet", "work"]);
        let me = user(0);
        for args in [
            vec!["symbolic-ref", "HEAD", "refs/heads/main"],
            vec!["config", "user.name", me.name.as_str()],
            vec!["config", "user.email", me.email.as_str()],
            vec!["config", "commit.gpgsign", "false"],
            vec!["remote", "add", "origin", remote.to_str().unwrap()],
        ] {
            run_git(&work, &args);
        }

        let previous_dir = env::current_dir().unwrap();
        let sandbox = Self {
            root,
            remote,
            work,
            previous_dir,
            _lock: lock,
        };
        sandbox.commit("README", "hello\n", "Initial commit");
        sandbox.git(&["push", "--quiet", "origin", "main"]);
        env::set_current_dir(&sandbox.work).unwrap();
        sandbox
    }

    /// Run `git` in the clone and return its trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        run_git(&self.work, args)
    }

    /// Write `content` to `file`, commit it as the configured user and
    /// return the new sha.
    pub fn commit(&self, file: &str, content: &str, message: &str) -> String {
        commit_in(&self.work, file, content, message)
    }

    /// Like [`GitSandbox::commit`], authored by someone else.
    pub fn commit_as(&self, author: &User, file: &str, content: &str, message: &str) -> String {
        fs::write(self.work.join(file), content).unwrap();
        self.git(&["add", file]);
        let author = author.to_string();
        self.git(&["commit", "--quiet", "--author", &author, "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// A second clone of the remote, for simulating another person pushing.
    pub fn other_clone(&self) -> PathBuf {
        let other = self.root.path().join("other");
        run_git(
            self.root.path(),
            &["clone", "--quiet", self.remote.to_str().unwrap(), "other"],
        );
        let me = user(1);
        run_git(&other, &["config", "user.name", me.name.as_str()]);
        run_git(&other, &["config", "user.email", me.email.as_str()]);
        run_git(&other, &["config", "commit.gpgsign", "false"]);
        other
    }

    /// Sha of `branch` on the bare remote, if it exists there.
    pub fn remote_sha(&self, branch: &str) -> Option<String> {
        let out = run_git(&self.work, &["ls-remote", "origin", &format!("refs/heads/{}", branch)]);
        out.split_whitespace().next().map(str::to_string)
    }
}

impl Drop for GitSandbox {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous_dir);
    }
}

/// Write `content` to `file` in the repository at `dir`, commit it and return
/// the new sha.
pub fn commit_in(dir: &Path, file: &str, content: &str, message: &str) -> String {
    fs::write(dir.join(file), content).unwrap();
    run_git(dir, &["add", file]);
    run_git(dir, &["commit", "--quiet", "-m", message]);
    run_git(dir, &["rev-parse", "HEAD"])
}

/// Run `git` in `dir`, panicking with its stderr if it fails.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
