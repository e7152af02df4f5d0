//! Reconciling a local branch with its pull request.
//!
//! [`pr_upsert`] decides, for one base/head pair, whether to push, skip,
//! close or create, and never force-pushes over commits that belong to
//! somebody else.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{Result, UpsertError};
use crate::gh::RepositoryHost;
use crate::git::SourceControl;
use crate::types::{BranchRef, PrState, PullRequest, Repository, User};

/// Everything [`pr_upsert`] needs to know about one base/head pair.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub base_repo: Repository,
    pub base_branch: String,
    pub local_branch: String,
    pub head_repo: Repository,
    pub head_branch: String,
    pub title: String,
    pub body: String,
    /// Posted on the PR when it gets closed for having no changes.
    pub close_comment: String,
}

impl UpsertRequest {
    fn base(&self) -> BranchRef {
        self.base_repo.branch(&self.base_branch)
    }

    fn head(&self) -> BranchRef {
        self.head_repo.branch(&self.head_branch)
    }

    fn local(&self) -> BranchRef {
        BranchRef::local(&self.local_branch)
    }
}

/// What a successful upsert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub pull_request: PullRequest,
    pub pushed: bool,
    pub created: bool,
}

impl Upserted {
    pub fn url(&self) -> &str {
        &self.pull_request.url
    }
}

/// Open, update or close the pull request for `request`.
///
/// Returns the open PR on success. Every other outcome is an error:
/// [`UpsertError::SameBranch`], [`UpsertError::MissingRemoteBranch`] for an
/// unfetched base, [`UpsertError::UnsupportedMergeCommits`],
/// [`UpsertError::NoChanges`] (possibly after closing a stale PR, which is
/// carried in the error), [`UpsertError::OtherPeople`], or whatever a
/// gateway call failed with.
pub fn pr_upsert<S, H>(scm: &S, host: &H, request: &UpsertRequest) -> Result<Upserted>
where
    S: SourceControl + ?Sized,
    H: RepositoryHost + ?Sized,
{
    if request.base_repo.is_same_repository(&request.head_repo)
        && request.base_branch == request.head_branch
    {
        return Err(UpsertError::SameBranch);
    }

    let base = request.base();
    let head = request.head();
    let local = request.local();

    // Every range below excludes base, so it has to exist. The head branch
    // may not exist yet, in which case it is left out of the ranges.
    if scm
        .remote_head(&request.base_repo.remote, &request.base_branch)?
        .is_none()
    {
        return Err(UpsertError::MissingRemoteBranch {
            branch: base.to_string(),
        });
    }
    let remote_head = scm.remote_head(&request.head_repo.remote, &request.head_branch)?;
    let existing_head = remote_head.as_ref().map(|_| &head);

    check_linear_history(scm, &local, existing_head, &base)?;

    let other_contributors = match existing_head {
        Some(head) => other_contributors(scm, &local, head, &base)?,
        None => BTreeSet::new(),
    };

    let local_diff = scm.diff(&[local.to_string(), base.excluded()])?;
    if local_diff.is_empty() {
        let mut closed = None;
        if let Some(mut pr) = find_pull_request(host, request)? {
            if other_contributors.is_empty() {
                info!(number = pr.number, url = %pr.url, "closing pull request with no changes");
                host.close_pull_request(&pr, &request.close_comment)?;
                pr.state = PrState::Closed;
                closed = Some(pr);
            } else {
                debug!(number = pr.number, "leaving pull request open, it has other contributors");
            }
        }
        return Err(UpsertError::NoChanges { closed });
    }

    let remote_diff = match existing_head {
        Some(head) => Some(scm.diff(&[head.to_string(), base.excluded()])?),
        None => None,
    };

    let pushed = if remote_diff.as_ref() != Some(&local_diff) {
        if !other_contributors.is_empty() {
            return Err(UpsertError::OtherPeople {
                contributors: other_contributors.into_iter().collect(),
            });
        }
        info!(local = %local, head = %head, "pushing");
        scm.push(
            &request.head_repo.remote,
            &request.local_branch,
            &request.head_branch,
            remote_head.as_deref(),
        )?;
        true
    } else {
        debug!(head = %head, "remote branch already up to date");
        false
    };

    let (pull_request, created) = match find_pull_request(host, request)? {
        Some(pr) => (pr, false),
        None => {
            let pr = host.create_pull_request(
                &request.base_repo,
                &request.base_branch,
                &request.head_repo,
                &request.head_branch,
                &request.title,
                &request.body,
            )?;
            (pr, true)
        }
    };

    Ok(Upserted {
        pull_request,
        pushed,
        created,
    })
}

fn find_pull_request<H>(host: &H, request: &UpsertRequest) -> Result<Option<PullRequest>>
where
    H: RepositoryHost + ?Sized,
{
    host.find_open_pull_request(
        &request.base_repo,
        &request.base_branch,
        &request.head_repo,
        &request.head_branch,
    )
}

/// Diffs and logs below assume a linear range; refuse merges anywhere on the
/// local or remote branch that aren't already on base.
fn check_linear_history<S>(
    scm: &S,
    local: &BranchRef,
    head: Option<&BranchRef>,
    base: &BranchRef,
) -> Result<()>
where
    S: SourceControl + ?Sized,
{
    let mut range = vec![local.to_string()];
    range.extend(head.map(|head| head.to_string()));
    range.push(base.excluded());
    let merges = scm.merge_commits(&range)?;
    if merges.is_empty() {
        Ok(())
    } else {
        Err(UpsertError::UnsupportedMergeCommits { commits: merges })
    }
}

/// Authors, other than the configured user, of commits that a force-push of
/// `local` onto `head` would discard: on `head` but neither on `local` nor
/// on `base`.
///
/// Only authors count. Committer identity changes whenever a commit is
/// rebased or cherry-picked, so it says nothing about whose work it is.
fn other_contributors<S>(
    scm: &S,
    local: &BranchRef,
    head: &BranchRef,
    base: &BranchRef,
) -> Result<BTreeSet<User>>
where
    S: SourceControl + ?Sized,
{
    let commits = scm.log(&[head.to_string(), local.excluded(), base.excluded()])?;
    let me = scm.configured_user()?;

    Ok(commits
        .into_iter()
        .map(|commit| commit.author)
        .filter(|author| *author != me)
        .collect())
}
