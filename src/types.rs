//! Value types shared by the git and GitHub gateways and the upsert engine.

use std::fmt;

use serde::Deserialize;

/// A git identity, compared by value for authorship checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A commit as reported by `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Commit {
    pub sha: String,
    pub author: User,
    pub committer: User,
}

/// A GitHub repository reachable through a named local remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Local git remote name, e.g. `origin`.
    pub remote: String,
    pub owner: String,
    pub name: String,
    /// `owner/name`, as GitHub spells it.
    pub name_with_owner: String,
    pub default_branch: String,
    pub url: String,
}

impl Repository {
    /// Whether `other` is the same hosted repository, regardless of which
    /// local remote it was resolved through.
    pub fn is_same_repository(&self, other: &Repository) -> bool {
        self.name_with_owner.eq_ignore_ascii_case(&other.name_with_owner)
    }

    /// The remote-tracking ref for `branch` on this repository's remote.
    pub fn branch(&self, branch: &str) -> BranchRef {
        BranchRef::remote(&self.remote, branch)
    }
}

/// Where a set of commits lives: a local branch or a remote-tracking branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub remote: Option<String>,
    pub branch: String,
}

impl BranchRef {
    pub fn local(branch: impl Into<String>) -> Self {
        Self {
            remote: None,
            branch: branch.into(),
        }
    }

    pub fn remote(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: Some(remote.into()),
            branch: branch.into(),
        }
    }

    /// Revision argument that excludes everything reachable from this ref.
    pub fn excluded(&self) -> String {
        format!("^{}", self)
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote {
            Some(remote) => write!(f, "{}/{}", remote, self.branch),
            None => write!(f, "{}", self.branch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
}

/// A GitHub pull request from `head_repo:head_branch` into `base_repo:base_branch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub base_repo: Repository,
    pub base_branch: String,
    pub head_repo: Repository,
    pub head_branch: String,
    pub number: u64,
    pub url: String,
    pub state: PrState,
}

/// Output of `git diff` between two ranges.
///
/// Only equality and emptiness are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff(String);

impl Diff {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}
