use crate::types::{PullRequest, User};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpsertError {
    #[error("You must change to a different branch before creating a PR")]
    SameBranch,

    #[error("Your branch has no changes compared to the base branch")]
    NoChanges {
        /// The stale PR that was closed on the way out, if any.
        closed: Option<PullRequest>,
    },

    #[error("Other people have pushed commits to the branch, not updating it")]
    OtherPeople { contributors: Vec<User> },

    #[error("gh-pr-upsert doesn't work when merge commits are present")]
    UnsupportedMergeCommits { commits: Vec<String> },

    #[error("Found {count} open pull requests from {head} into {base}, expected at most one")]
    HostingInconsistency {
        base: String,
        head: String,
        count: usize,
    },

    #[error("You must check out a branch before creating a PR")]
    DetachedHead,

    #[error("Remote branch {branch} not found, run `git fetch` or check the branch name")]
    MissingRemoteBranch { branch: String },

    #[error("`{command}` failed with exit status {status}")]
    Command {
        command: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse the output of `{command}`: {source}")]
    Json {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl UpsertError {
    /// Process exit status the CLI reports for this error.
    ///
    /// Subprocess failures keep the failing tool's own status so callers
    /// scripting around `gh-pr-upsert` see what `git`/`gh` reported.
    pub fn exit_status(&self) -> i32 {
        match self {
            UpsertError::SameBranch => 2,
            UpsertError::NoChanges { .. } => 3,
            UpsertError::OtherPeople { .. } => 4,
            UpsertError::Command { status, .. } if (1..=255).contains(status) => *status,
            UpsertError::UnsupportedMergeCommits { .. }
            | UpsertError::HostingInconsistency { .. }
            | UpsertError::DetachedHead
            | UpsertError::MissingRemoteBranch { .. }
            | UpsertError::Command { .. }
            | UpsertError::Spawn { .. }
            | UpsertError::Json { .. }
            | UpsertError::Io(_)
            | UpsertError::Config(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpsertError>;
