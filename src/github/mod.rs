//! Hosting service layer.
//!
//! Everything the robot needs from GitHub goes through the [`HostingClient`]
//! trait. The production implementation ([`GithubClient`]) talks to the REST
//! API over blocking `reqwest`; tests use the in-memory fake in `fake`.
//!
//! Errors are reported as [`ApiError`] so callers can tell a plain
//! "not found" apart from every other failure without inspecting strings.

mod http;

#[cfg(test)]
pub mod fake;

pub use http::{DEFAULT_API_URL, GithubClient};

use serde::Deserialize;
use thiserror::Error;

/// Failure of a single call against the hosting service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{path}: 404 Not Found")]
    NotFound { path: String },

    #[error("{path}: {status} {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// A repository as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
    /// `User` or `Organization`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// One page of the repository listing plus the rate-limit headers.
#[derive(Debug, Clone)]
pub struct RepoPage {
    pub repos: Vec<Repository>,
    pub remaining_quota: Option<u32>,
    pub next_page: Option<u32>,
}

/// Result of a contents lookup: either a single decoded file or a listing.
#[derive(Debug, Clone)]
pub enum Contents {
    File(RemoteFile),
    Dir(Vec<DirEntry>),
}

/// A file read from the remote, with its blob sha.
///
/// The sha is the optimistic-concurrency token required by update and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// Parameters of a file write on a branch.
///
/// `content` is absent for deletes, `sha` is absent for creates.
#[derive(Debug, Clone)]
pub struct FileChange<'a> {
    pub message: String,
    pub branch: &'a str,
    pub content: Option<&'a [u8]>,
    pub sha: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct GitRef {
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Clone)]
pub struct NewPullRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub maintainer_can_modify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Capabilities the robot consumes from the hosting service.
///
/// Branch arguments are plain branch names (`main`, `robot-works-…`);
/// implementations add the `refs/heads/` prefix where the API wants it.
pub trait HostingClient {
    fn list_user_repos(&self, user: &str, page: u32, per_page: u8) -> Result<RepoPage, ApiError>;

    fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents, ApiError>;

    fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError>;

    fn update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError>;

    fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError>;

    fn get_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<GitRef, ApiError>;

    fn create_ref(&self, owner: &str, repo: &str, branch: &str, sha: &str)
    -> Result<(), ApiError>;

    fn delete_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<(), ApiError>;

    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest<'_>,
    ) -> Result<PullRequest, ApiError>;

    fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        commit_title: &str,
    ) -> Result<(), ApiError>;

    fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError>;
}
