//! Configuration: the optional config file plus command-line overrides,
//! resolved into an [`UpsertRequest`].

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, UpsertError};
use crate::gh::RepositoryHost;
use crate::git::SourceControl;
use crate::upsert::UpsertRequest;

/// The config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "gh-pr-upsert";

const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_REMOTE: &str = "origin";

pub const DEFAULT_CLOSE_COMMENT: &str =
    "Closing this pull request because its branch no longer has any changes compared to the base branch.";

/// Settings read from `~/.config/gh-pr-upsert/config.toml`.
///
/// Every field is optional in the file:
///
/// ```toml
/// # Remote of the repository PRs are opened against
/// base_remote = "upstream"
///
/// # Remote branches are pushed to (defaults to base_remote)
/// head_remote = "origin"
///
/// # Comment posted when a PR is closed for having no changes
/// close_comment = "Nothing left to merge here."
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub base_remote: String,

    #[serde(default)]
    pub head_remote: Option<String>,

    #[serde(default = "default_close_comment")]
    pub close_comment: String,
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

fn default_close_comment() -> String {
    DEFAULT_CLOSE_COMMENT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_remote: default_remote(),
            head_remote: None,
            close_comment: default_close_comment(),
        }
    }
}

/// Get the config directory path (~/.config/gh-pr-upsert/).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| UpsertError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Load the config file, or the defaults if there isn't one.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        UpsertError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub base_remote: Option<String>,
    pub base_branch: Option<String>,
    pub head_remote: Option<String>,
    pub head_branch: Option<String>,
    pub local_branch: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    /// `-` reads the body from stdin.
    pub body_file: Option<PathBuf>,
    pub close_comment: Option<String>,
}

/// Fill in everything not given on the command line.
///
/// Command-line values win over the config file, which wins over the
/// built-in defaults:
///
/// - base remote: `origin`; head remote: the base remote
/// - base branch: the base repository's default branch
/// - local branch: the checked-out branch; head branch: the local branch
/// - title/body: the last commit on the local branch
pub fn resolve_request<S, H>(
    overrides: Overrides,
    config: &Config,
    scm: &S,
    host: &H,
) -> Result<UpsertRequest>
where
    S: SourceControl + ?Sized,
    H: RepositoryHost + ?Sized,
{
    let base_remote = overrides
        .base_remote
        .unwrap_or_else(|| config.base_remote.clone());
    let head_remote = overrides
        .head_remote
        .or_else(|| config.head_remote.clone())
        .unwrap_or_else(|| base_remote.clone());

    let base_repo = host.resolve_repository(&base_remote)?;
    let head_repo = host.resolve_repository(&head_remote)?;

    let base_branch = overrides
        .base_branch
        .unwrap_or_else(|| base_repo.default_branch.clone());
    let local_branch = match overrides.local_branch {
        Some(branch) => branch,
        None => scm.current_branch()?,
    };
    let head_branch = overrides
        .head_branch
        .unwrap_or_else(|| local_branch.clone());

    let body = match (overrides.body, overrides.body_file) {
        (Some(body), _) => Some(body),
        (None, Some(path)) => Some(read_body_file(&path)?),
        (None, None) => None,
    };
    let (title, body) = match (overrides.title, body) {
        (Some(title), Some(body)) => (title, body),
        (title, body) => {
            let (subject, commit_body) = scm.last_commit_message(&local_branch)?;
            (title.unwrap_or(subject), body.unwrap_or(commit_body))
        }
    };

    let close_comment = overrides
        .close_comment
        .unwrap_or_else(|| config.close_comment.clone());

    Ok(UpsertRequest {
        base_repo,
        base_branch,
        local_branch,
        head_repo,
        head_branch,
        title,
        body,
        close_comment,
    })
}

/// Read a PR body from `path`, or from stdin if `path` is `-`.
pub fn read_body_file(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        io::stdin().read_to_string(&mut body)?;
        return Ok(body);
    }

    fs::read_to_string(path).map_err(|e| {
        UpsertError::Config(format!("Could not read body file {}: {}", path.display(), e))
    })
}
