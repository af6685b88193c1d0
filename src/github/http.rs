use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use super::{
    ApiError, Contents, DirEntry, FileChange, GitRef, HostingClient, NewPullRequest, PullRequest,
    RemoteFile, RepoPage, Repository,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[^>]*[?&]page=(\d+)[^>]*>;\s*rel="next""#).expect("valid Link header pattern")
});

/// Blocking GitHub REST client authenticated with a bearer token.
pub struct GithubClient {
    http: Client,
    base: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("kaatinga-robot"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("GITHUB_TOKEN contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            base: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send a request and map non-success statuses onto [`ApiError`].
    fn send(&self, req: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let resp = req.send()?;
        let status = resp.status();
        debug!(%status, path, "github response");

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .map(|b| b.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    fn write_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        let api_path = format!("/repos/{}/{}/contents/{}", owner, repo, path);
        let body = WriteBody {
            message: &change.message,
            branch: change.branch,
            content: change.content.map(|c| STANDARD.encode(c)),
            sha: change.sha,
        };
        self.send(self.http.put(self.url(&api_path)).json(&body), &api_path)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct WriteBody<'a> {
    message: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsBody {
    Dir(Vec<DirEntry>),
    File(FileBody),
}

#[derive(Deserialize)]
struct FileBody {
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize)]
struct RefBody {
    #[serde(rename = "ref")]
    name: String,
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct BranchBody {
    name: String,
}

/// Decode the `content` field of a file response.
///
/// GitHub wraps the base64 payload at 60 columns, so whitespace is stripped
/// before decoding. Files above 1 MB come back with encoding `none` and no
/// content; those cannot be compared and are reported as malformed.
fn decode_file(body: FileBody) -> Result<RemoteFile, ApiError> {
    if body.encoding != "base64" {
        return Err(ApiError::Decode(format!(
            "'{}' has unsupported encoding '{}'",
            body.path, body.encoding
        )));
    }
    let packed: String = body
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let content = STANDARD
        .decode(packed)
        .map_err(|e| ApiError::Decode(format!("'{}': {}", body.path, e)))?;
    Ok(RemoteFile {
        name: body.name,
        path: body.path,
        sha: body.sha,
        content,
    })
}

/// Read a successful response body as JSON.
///
/// Transport failures while reading stay [`ApiError::Transport`]; a body
/// that is not the expected JSON is [`ApiError::Decode`].
fn decode<T: DeserializeOwned>(resp: Response, path: &str) -> Result<T, ApiError> {
    let text = resp.text()?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("'{}': {}", path, e)))
}

/// Extract the page number of the `rel="next"` entry of a `Link` header.
fn next_page(link: &str) -> Option<u32> {
    NEXT_LINK.captures(link)?.get(1)?.as_str().parse().ok()
}

fn header_u32(resp: &Response, name: &str) -> Option<u32> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn link_next(resp: &Response) -> Option<u32> {
    resp.headers()
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(next_page)
}

impl HostingClient for GithubClient {
    fn list_user_repos(&self, user: &str, page: u32, per_page: u8) -> Result<RepoPage, ApiError> {
        let path = format!("/users/{}/repos", user);
        let req = self.http.get(self.url(&path)).query(&[
            ("type", "owner".to_string()),
            ("sort", "updated".to_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ]);
        let resp = self.send(req, &path)?;
        let remaining_quota = header_u32(&resp, "x-ratelimit-remaining");
        let next_page = link_next(&resp);
        let repos: Vec<Repository> = decode(resp, &path)?;
        Ok(RepoPage {
            repos,
            remaining_quota,
            next_page,
        })
    }

    fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents, ApiError> {
        let api_path = format!("/repos/{}/{}/contents/{}", owner, repo, path);
        let mut req = self.http.get(self.url(&api_path));
        if let Some(r) = git_ref {
            req = req.query(&[("ref", r)]);
        }
        match decode::<ContentsBody>(self.send(req, &api_path)?, &api_path)? {
            ContentsBody::Dir(entries) => Ok(Contents::Dir(entries)),
            ContentsBody::File(body) => decode_file(body).map(Contents::File),
        }
    }

    fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        self.write_file(owner, repo, path, change)
    }

    fn update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        self.write_file(owner, repo, path, change)
    }

    fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        let api_path = format!("/repos/{}/{}/contents/{}", owner, repo, path);
        let body = WriteBody {
            message: &change.message,
            branch: change.branch,
            content: None,
            sha: change.sha,
        };
        self.send(self.http.delete(self.url(&api_path)).json(&body), &api_path)?;
        Ok(())
    }

    fn get_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<GitRef, ApiError> {
        let path = format!("/repos/{}/{}/git/ref/heads/{}", owner, repo, branch);
        let body: RefBody = decode(self.send(self.http.get(self.url(&path)), &path)?, &path)?;
        Ok(GitRef {
            name: body.name,
            sha: body.object.sha,
        })
    }

    fn create_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/repos/{}/{}/git/refs", owner, repo);
        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });
        self.send(self.http.post(self.url(&path)).json(&body), &path)?;
        Ok(())
    }

    fn delete_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<(), ApiError> {
        let path = format!("/repos/{}/{}/git/refs/heads/{}", owner, repo, branch);
        self.send(self.http.delete(self.url(&path)), &path)?;
        Ok(())
    }

    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest<'_>,
    ) -> Result<PullRequest, ApiError> {
        let path = format!("/repos/{}/{}/pulls", owner, repo);
        let body = serde_json::json!({
            "title": pr.title,
            "body": pr.body,
            "head": pr.head,
            "base": pr.base,
            "maintainer_can_modify": pr.maintainer_can_modify,
        });
        let resp = self.send(self.http.post(self.url(&path)).json(&body), &path)?;
        decode(resp, &path)
    }

    fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        commit_title: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/repos/{}/{}/pulls/{}/merge", owner, repo, number);
        let body = serde_json::json!({ "commit_title": commit_title });
        self.send(self.http.put(self.url(&path)).json(&body), &path)?;
        Ok(())
    }

    fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError> {
        let path = format!("/repos/{}/{}/branches", owner, repo);
        let mut names = Vec::new();
        let mut page = 1u32;
        loop {
            let req = self.http.get(self.url(&path)).query(&[
                ("per_page", "100".to_string()),
                ("page", page.to_string()),
            ]);
            let resp = self.send(req, &path)?;
            let next = link_next(&resp);
            let branches: Vec<BranchBody> = decode(resp, &path)?;
            names.extend(branches.into_iter().map(|b| b.name));
            match next {
                Some(n) => page = n,
                None => break,
            }
        }
        Ok(names)
    }
}
