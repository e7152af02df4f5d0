//! Invocation-scoped memoization for the gateways.
//!
//! A single upsert asks the same questions several times (the engine's
//! other-contributor check and its push decision both need the remote
//! branch, PR lookup happens on two paths, ...). Remote state is assumed not
//! to change during one run, so queries are answered once per wrapper.
//! Mutations always pass straight through. Create a fresh wrapper, or call
//! `clear()`, between independent runs.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::Result;
use crate::gh::RepositoryHost;
use crate::git::SourceControl;
use crate::types::{Commit, Diff, PullRequest, Repository, User};

/// Memoizing [`SourceControl`] wrapper.
#[derive(Debug, Default)]
pub struct MemoSourceControl<S> {
    inner: S,
    current_branch: RefCell<Option<String>>,
    configured_user: RefCell<Option<User>>,
    remote_heads: RefCell<HashMap<(String, String), Option<String>>>,
    diffs: RefCell<HashMap<Vec<String>, Diff>>,
    logs: RefCell<HashMap<Vec<String>, Vec<Commit>>>,
    merges: RefCell<HashMap<Vec<String>, Vec<String>>>,
    messages: RefCell<HashMap<String, (String, String)>>,
}

impl<S: SourceControl> MemoSourceControl<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            current_branch: RefCell::new(None),
            configured_user: RefCell::new(None),
            remote_heads: RefCell::new(HashMap::new()),
            diffs: RefCell::new(HashMap::new()),
            logs: RefCell::new(HashMap::new()),
            merges: RefCell::new(HashMap::new()),
            messages: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Forget every memoized answer.
    pub fn clear(&self) {
        self.current_branch.borrow_mut().take();
        self.configured_user.borrow_mut().take();
        self.remote_heads.borrow_mut().clear();
        self.diffs.borrow_mut().clear();
        self.logs.borrow_mut().clear();
        self.merges.borrow_mut().clear();
        self.messages.borrow_mut().clear();
    }
}

fn memoized<K, V, F>(cache: &RefCell<HashMap<K, V>>, key: K, compute: F) -> Result<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
    F: FnOnce() -> Result<V>,
{
    if let Some(hit) = cache.borrow().get(&key) {
        return Ok(hit.clone());
    }
    let value = compute()?;
    cache.borrow_mut().insert(key, value.clone());
    Ok(value)
}

fn memoized_once<V, F>(cell: &RefCell<Option<V>>, compute: F) -> Result<V>
where
    V: Clone,
    F: FnOnce() -> Result<V>,
{
    if let Some(hit) = cell.borrow().as_ref() {
        return Ok(hit.clone());
    }
    let value = compute()?;
    *cell.borrow_mut() = Some(value.clone());
    Ok(value)
}

impl<S: SourceControl> SourceControl for MemoSourceControl<S> {
    fn current_branch(&self) -> Result<String> {
        memoized_once(&self.current_branch, || self.inner.current_branch())
    }

    fn remote_head(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        memoized(
            &self.remote_heads,
            (remote.to_string(), branch.to_string()),
            || self.inner.remote_head(remote, branch),
        )
    }

    fn diff(&self, range: &[String]) -> Result<Diff> {
        memoized(&self.diffs, range.to_vec(), || self.inner.diff(range))
    }

    fn log(&self, range: &[String]) -> Result<Vec<Commit>> {
        memoized(&self.logs, range.to_vec(), || self.inner.log(range))
    }

    fn merge_commits(&self, range: &[String]) -> Result<Vec<String>> {
        memoized(&self.merges, range.to_vec(), || self.inner.merge_commits(range))
    }

    fn configured_user(&self) -> Result<User> {
        memoized_once(&self.configured_user, || self.inner.configured_user())
    }

    fn last_commit_message(&self, rev: &str) -> Result<(String, String)> {
        memoized(&self.messages, rev.to_string(), || {
            self.inner.last_commit_message(rev)
        })
    }

    fn push(
        &self,
        remote: &str,
        local_branch: &str,
        remote_branch: &str,
        expected_remote_head: Option<&str>,
    ) -> Result<()> {
        self.inner
            .push(remote, local_branch, remote_branch, expected_remote_head)?;
        // The branch moved; later questions about it must be asked again.
        self.remote_heads
            .borrow_mut()
            .remove(&(remote.to_string(), remote_branch.to_string()));
        self.diffs.borrow_mut().clear();
        self.logs.borrow_mut().clear();
        self.merges.borrow_mut().clear();
        Ok(())
    }
}

type PullRequestKey = (String, String, String, String);

fn pull_request_key(
    base_repo: &Repository,
    base_branch: &str,
    head_repo: &Repository,
    head_branch: &str,
) -> PullRequestKey {
    (
        base_repo.name_with_owner.clone(),
        base_branch.to_string(),
        head_repo.name_with_owner.clone(),
        head_branch.to_string(),
    )
}

/// Memoizing [`RepositoryHost`] wrapper.
#[derive(Debug, Default)]
pub struct MemoRepositoryHost<H> {
    inner: H,
    repositories: RefCell<HashMap<String, Repository>>,
    pull_requests: RefCell<HashMap<PullRequestKey, Option<PullRequest>>>,
}

impl<H: RepositoryHost> MemoRepositoryHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            repositories: RefCell::new(HashMap::new()),
            pull_requests: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Forget every memoized answer.
    pub fn clear(&self) {
        self.repositories.borrow_mut().clear();
        self.pull_requests.borrow_mut().clear();
    }
}

impl<H: RepositoryHost> RepositoryHost for MemoRepositoryHost<H> {
    fn resolve_repository(&self, remote: &str) -> Result<Repository> {
        memoized(&self.repositories, remote.to_string(), || {
            self.inner.resolve_repository(remote)
        })
    }

    fn find_open_pull_request(
        &self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
    ) -> Result<Option<PullRequest>> {
        memoized(
            &self.pull_requests,
            pull_request_key(base_repo, base_branch, head_repo, head_branch),
            || {
                self.inner
                    .find_open_pull_request(base_repo, base_branch, head_repo, head_branch)
            },
        )
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
        let created = self.inner.create_pull_request(
            base_repo,
            base_branch,
            head_repo,
            head_branch,
            title,
            body,
        )?;
        self.pull_requests.borrow_mut().insert(
            pull_request_key(base_repo, base_branch, head_repo, head_branch),
            Some(created.clone()),
        );
        Ok(created)
    }

    fn close_pull_request(&self, pull_request: &PullRequest, comment: &str) -> Result<()> {
        self.inner.close_pull_request(pull_request, comment)?;
        self.pull_requests.borrow_mut().insert(
            pull_request_key(
                &pull_request.base_repo,
                &pull_request.base_branch,
                &pull_request.head_repo,
                &pull_request.head_branch,
            ),
            None,
        );
        Ok(())
    }
}
