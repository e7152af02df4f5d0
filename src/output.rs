//! Terminal output for gh-pr-upsert.
//!
//! The PR URL is the only thing written to stdout, so the tool can be used
//! as `url=$(gh-pr-upsert)`. Everything else goes to stderr.

use crate::error::UpsertError;
use crate::upsert::Upserted;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", error_line(msg));
}

fn error_line(msg: &str) -> String {
    format!("{RED}{BOLD}Error:{RESET} {}", msg)
}

/// Print what a successful upsert did, then its URL on stdout.
pub fn print_upserted(upserted: &Upserted) {
    for line in upserted_lines(upserted) {
        eprintln!("{}", line);
    }
    println!("{}", upserted.url());
}

/// Status lines (for stderr) describing a successful upsert.
pub fn upserted_lines(upserted: &Upserted) -> Vec<String> {
    let pr = &upserted.pull_request;
    let pushed = if upserted.pushed {
        format!(
            "{GREEN}Pushed{RESET} to {CYAN}{}/{}{RESET}",
            pr.head_repo.remote, pr.head_branch
        )
    } else {
        format!("{GRAY}Branch already up-to-date on remote.{RESET}")
    };
    let created = if upserted.created {
        format!("{GREEN}Created pull request #{}{RESET}", pr.number)
    } else {
        format!("{CYAN}Pull request #{} already exists{RESET}", pr.number)
    };
    vec![pushed, created]
}

/// Print an error the way the CLI reports it.
pub fn print_failure(err: &UpsertError) {
    for line in failure_lines(err) {
        eprintln!("{}", line);
    }
}

/// Lines (for stderr) reporting `err`.
///
/// Extra detail goes with some variants: the stale PR that was closed, the
/// people whose commits blocked a push, or the captured output of a failed
/// `git`/`gh` call, stderr first, verbatim.
pub fn failure_lines(err: &UpsertError) -> Vec<String> {
    let mut lines = Vec::new();
    match err {
        UpsertError::NoChanges { closed: Some(pr) } => {
            lines.push(format!(
                "{YELLOW}Closed pull request #{}:{RESET} {}",
                pr.number, pr.url
            ));
            lines.push(error_line(&err.to_string()));
        }
        UpsertError::OtherPeople { contributors } => {
            lines.push(error_line(&err.to_string()));
            lines.extend(
                contributors
                    .iter()
                    .map(|user| format!("{GRAY}  commits by {}{RESET}", user)),
            );
        }
        UpsertError::UnsupportedMergeCommits { commits } => {
            lines.push(error_line(&err.to_string()));
            lines.extend(
                commits
                    .iter()
                    .map(|sha| format!("{GRAY}  merge commit {}{RESET}", sha)),
            );
        }
        UpsertError::Command { stdout, stderr, .. } => {
            lines.push(error_line(&err.to_string()));
            for captured in [stderr, stdout] {
                let captured = captured.strip_suffix('\n').unwrap_or(captured.as_str());
                if !captured.is_empty() {
                    lines.push(captured.to_string());
                }
            }
        }
        _ => lines.push(error_line(&err.to_string())),
    }
    lines
}
