//! JSON shapes returned by `gh repo view` and the GitHub pulls API.

use serde::Deserialize;

use crate::types::{PrState, PullRequest, Repository};

/// Output of `gh repo view --json owner,name,nameWithOwner,defaultBranchRef,url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoView {
    pub owner: Owner,
    pub name: String,
    pub name_with_owner: String,
    pub default_branch_ref: BranchName,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchName {
    pub name: String,
}

impl RepoView {
    pub fn into_repository(self, remote: &str) -> Repository {
        Repository {
            remote: remote.to_string(),
            owner: self.owner.login,
            name: self.name,
            name_with_owner: self.name_with_owner,
            default_branch: self.default_branch_ref.name,
            url: self.url,
        }
    }
}

/// The subset of a REST pull request object this tool reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestJson {
    pub number: u64,
    pub html_url: String,
    #[serde(default = "default_state")]
    pub state: PrState,
}

fn default_state() -> PrState {
    PrState::Open
}

impl PullRequestJson {
    pub fn into_pull_request(
        self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
    ) -> PullRequest {
        PullRequest {
            base_repo: base_repo.clone(),
            base_branch: base_branch.to_string(),
            head_repo: head_repo.clone(),
            head_branch: head_branch.to_string(),
            number: self.number,
            url: self.html_url,
            state: self.state,
        }
    }
}
