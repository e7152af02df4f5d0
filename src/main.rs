//! gh-pr-upsert CLI entry point.
//!
//! Resolves the base/head pair from flags and config, runs the upsert and
//! maps the outcome to an exit status.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gh_pr_upsert::config::{load_config, resolve_request, Overrides};
use gh_pr_upsert::output::{print_failure, print_upserted};
use gh_pr_upsert::process::SystemRunner;
use gh_pr_upsert::{
    logging, pr_upsert, Git, GitHub, MemoRepositoryHost, MemoSourceControl, Result, Upserted,
};

#[derive(Parser, Debug)]
#[command(name = "gh-pr-upsert")]
#[command(
    version,
    about = "Create or update a pull request for the current branch",
    after_help = "EXAMPLES:
    # Open a PR for the current branch, or update the existing one
    gh-pr-upsert

    # PR from your fork into upstream's develop branch
    gh-pr-upsert --base-remote upstream --head-remote origin --base-branch develop

    # Explicit title and body
    gh-pr-upsert --title \"Fix the frobnicator\" --body-file pr.md

BEHAVIOR:
    Pushes the local branch (with --force-with-lease) if its changes differ
    from the remote branch, then opens a PR if none exists. If the branch has
    no changes compared to the base branch, an existing PR is closed instead.
    Nothing is pushed if that would discard commits authored by anyone but
    you (git config user.name / user.email).

EXIT STATUS:
    0  success, the PR's URL is printed
    2  base and head are the same branch
    3  no changes compared to the base branch
    4  other people have commits on the remote branch
    64 invalid command-line usage
    git/gh failures exit with that tool's own status

CONFIG FILE:
    ~/.config/gh-pr-upsert/config.toml (base_remote, head_remote, close_comment)"
)]
struct Cli {
    /// Remote of the repository to open the PR against [default: origin]
    #[arg(long, value_name = "REMOTE")]
    base_remote: Option<String>,

    /// Branch to merge into [default: the base repository's default branch]
    #[arg(long, value_name = "BRANCH")]
    base_branch: Option<String>,

    /// Remote to push the branch to [default: the base remote]
    #[arg(long, value_name = "REMOTE")]
    head_remote: Option<String>,

    /// Name of the branch on the head remote [default: the local branch name]
    #[arg(long, value_name = "BRANCH")]
    head_branch: Option<String>,

    /// Local branch to push [default: the checked-out branch]
    #[arg(long, value_name = "BRANCH")]
    local_branch: Option<String>,

    /// PR title [default: subject of the last commit]
    #[arg(long)]
    title: Option<String>,

    /// PR body [default: body of the last commit]
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the PR body from a file ('-' for stdin)
    #[arg(long, value_name = "FILE")]
    body_file: Option<PathBuf>,

    /// Comment to post when closing a PR that has no changes left
    #[arg(long, value_name = "TEXT")]
    close_comment: Option<String>,

    /// Print every git and gh command as it runs
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(self) -> Overrides {
        Overrides {
            base_remote: self.base_remote,
            base_branch: self.base_branch,
            head_remote: self.head_remote,
            head_branch: self.head_branch,
            local_branch: self.local_branch,
            title: self.title,
            body: self.body,
            body_file: self.body_file,
            close_comment: self.close_comment,
        }
    }
}

/// `EX_USAGE`, kept apart from the statuses an upsert can end with.
const USAGE_EXIT_STATUS: u8 = 64;

/// Exit status for a clap parse result that isn't a `Cli`: `--help` and
/// `--version` succeed, anything else is a usage error.
fn parse_exit_status(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        USAGE_EXIT_STATUS
    } else {
        0
    }
}

fn run(cli: Cli) -> Result<Upserted> {
    let config = load_config()?;
    let scm = MemoSourceControl::new(Git::new(SystemRunner));
    let host = MemoRepositoryHost::new(GitHub::new(SystemRunner));

    let request = resolve_request(cli.overrides(), &config, &scm, &host)?;
    pr_upsert(&scm, &host, &request)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(parse_exit_status(&err));
        }
    };
    logging::init(cli.verbose);

    match run(cli) {
        Ok(upserted) => {
            print_upserted(&upserted);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_failure(&err);
            ExitCode::from(u8::try_from(err.exit_status()).unwrap_or(1))
        }
    }
}
