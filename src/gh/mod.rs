//! GitHub integration through the GitHub CLI.
//!
//! # Modules
//!
//! - [`types`] - JSON shapes returned by `gh`
//! - [`client`] - [`GitHub`], the `gh`-backed [`RepositoryHost`]

mod client;
mod types;

pub use client::{GitHub, API_VERSION_HEADER};
pub use types::{PullRequestJson, RepoView};

use crate::error::Result;
use crate::types::{PullRequest, Repository};

/// Queries and mutations the upsert engine needs from the hosting side.
pub trait RepositoryHost {
    /// The hosted repository behind local remote `remote`.
    fn resolve_repository(&self, remote: &str) -> Result<Repository>;

    /// The open PR from `head_repo:head_branch` into `base_repo:base_branch`.
    ///
    /// Fails with `UpsertError::HostingInconsistency` if GitHub reports more
    /// than one.
    fn find_open_pull_request(
        &self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
    ) -> Result<Option<PullRequest>>;

    fn create_pull_request(
        &self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest>;

    fn close_pull_request(&self, pull_request: &PullRequest, comment: &str) -> Result<()>;
}
