//! `gh`-backed implementation of [`RepositoryHost`].

use tracing::{debug, info};

use crate::error::{Result, UpsertError};
use crate::process::{args, command_line, run_checked, run_json, run_stdout, CommandRunner, SystemRunner};
use crate::types::{PullRequest, Repository};

use super::types::{PullRequestJson, RepoView};
use super::RepositoryHost;

/// REST API version pinned on every `gh api` call.
pub const API_VERSION_HEADER: &str = "X-GitHub-Api-Version:2022-11-28";

/// Talks to GitHub by shelling out to `gh` (and `git` to read remote URLs).
#[derive(Debug, Clone, Default)]
pub struct GitHub<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> GitHub<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn pulls_endpoint(repo: &Repository) -> String {
        format!("/repos/{}/{}/pulls", repo.owner, repo.name)
    }

    fn api_args(method: &str, endpoint: String, paginate: bool) -> Vec<String> {
        let mut api = args(["api", "--header", API_VERSION_HEADER]);
        if paginate {
            api.push("--paginate".to_string());
        }
        api.extend(args(["--method", method]));
        api.push(endpoint);
        api
    }
}

impl<R: CommandRunner> RepositoryHost for GitHub<R> {
    fn resolve_repository(&self, remote: &str) -> Result<Repository> {
        let url = run_stdout(&self.runner, "git", &args(["remote", "get-url", remote]))?;
        let view: RepoView = run_json(
            &self.runner,
            "gh",
            &args([
                "repo",
                "view",
                "--json",
                "owner,name,nameWithOwner,defaultBranchRef,url",
                url.as_str(),
            ]),
        )?;
        let repo = view.into_repository(remote);
        debug!(remote, repo = %repo.name_with_owner, "resolved repository");
        Ok(repo)
    }

    fn find_open_pull_request(
        &self,
        base_repo: &Repository,
        base_branch: &str,
        head_repo: &Repository,
        head_branch: &str,
    ) -> Result<Option<PullRequest>> {
        let mut gh_args = Self::api_args("GET", Self::pulls_endpoint(base_repo), true);
        gh_args.extend([
            "-f".to_string(),
            format!("base={}", base_branch),
            "-f".to_string(),
            format!("head={}:{}", head_repo.owner, head_branch),
            "-f".to_string(),
            "state=open".to_string(),
        ]);
        let output = run_checked(&self.runner, "gh", &gh_args)?;

        // --paginate prints one JSON array per page back to back.
        let mut matches = Vec::new();
        for page in serde_json::Deserializer::from_str(&output.stdout).into_iter::<Vec<PullRequestJson>>() {
            let page = page.map_err(|source| UpsertError::Json {
                command: command_line("gh", &gh_args),
                source,
            })?;
            matches.extend(page);
        }

        match matches.len() {
            0 => Ok(None),
            1 => {
                let pr = matches.remove(0);
                Ok(Some(pr.into_pull_request(base_repo, base_branch, head_repo, head_branch)))
            }
            count => Err(UpsertError::HostingInconsistency {
                base: format!("{}:{}", base_repo.name_with_owner, base_branch),
                head: format!("{}:{}", head_repo.name_with_owner, head_branch),
                count,
            }),
        }
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
        let mut gh_args = Self::api_args("POST", Self::pulls_endpoint(base_repo), false);
        gh_args.extend([
            "-f".to_string(),
            format!("base={}", base_branch),
            "-f".to_string(),
            format!("head={}:{}", head_repo.owner, head_branch),
            "-f".to_string(),
            format!("title={}", title),
            "-f".to_string(),
            format!("body={}", body),
        ]);
        let created: PullRequestJson = run_json(&self.runner, "gh", &gh_args)?;
        info!(number = created.number, url = %created.html_url, "created pull request");
        Ok(created.into_pull_request(base_repo, base_branch, head_repo, head_branch))
    }

    fn close_pull_request(&self, pull_request: &PullRequest, comment: &str) -> Result<()> {
        info!(number = pull_request.number, "closing pull request");
        run_checked(
            &self.runner,
            "gh",
            &args([
                "pr".to_string(),
                "close".to_string(),
                "--repo".to_string(),
                pull_request.base_repo.name_with_owner.clone(),
                "--delete-branch".to_string(),
                "--comment".to_string(),
                comment.to_string(),
                pull_request.number.to_string(),
            ]),
        )?;
        Ok(())
    }
}
