//! Create, update or close the GitHub pull request for a local branch without
//! discarding anybody else's commits.

pub mod config;
pub mod error;
pub mod gh;
pub mod git;
pub mod logging;
pub mod memo;
pub mod output;
pub mod process;
pub mod types;
pub mod upsert;

#[cfg(test)]
mod test_utils;

pub use error::{Result, UpsertError};
pub use gh::{GitHub, RepositoryHost};
pub use git::{Git, SourceControl};
pub use memo::{MemoRepositoryHost, MemoSourceControl};
pub use upsert::{pr_upsert, UpsertRequest, Upserted};
