//! In-memory hosting service for tests.
//!
//! Each repository holds a set of branches, each branch a flat map of path to
//! bytes. Directory listings are derived from path prefixes. Every call is
//! recorded so tests can assert on what the robot asked for, and any
//! operation can be made to fail on demand.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

use super::{
    ApiError, Contents, DirEntry, EntryKind, FileChange, GitRef, HostingClient, NewPullRequest,
    Owner, PullRequest, RemoteFile, RepoPage, Repository,
};

type Tree = BTreeMap<String, Vec<u8>>;

struct RemoteRepo {
    meta: Repository,
    branches: BTreeMap<String, Tree>,
    default_branch: String,
}

#[derive(Default)]
struct State {
    repos: Vec<RemoteRepo>,
    quota: Option<u32>,
    failing: HashSet<&'static str>,
    frozen_writes: bool,
    calls: Vec<String>,
    pulls: Vec<(String, String, String)>,
}

#[derive(Default)]
pub struct FakeHost {
    state: RefCell<State>,
}

/// A plain, user-owned, non-fork repository descriptor.
pub fn repo(owner: &str, name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        fork: false,
        archived: false,
        owner: Owner {
            login: owner.to_string(),
            kind: "User".to_string(),
        },
    }
}

fn blob_sha(content: &[u8]) -> String {
    let mut h = DefaultHasher::new();
    content.hash(&mut h);
    format!("{:016x}", h.finish())
}

fn not_found(path: impl Into<String>) -> ApiError {
    ApiError::NotFound { path: path.into() }
}

fn unprocessable(path: impl Into<String>, message: &str) -> ApiError {
    ApiError::Status {
        path: path.into(),
        status: 422,
        message: message.to_string(),
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository whose default branch holds `files`.
    pub fn add_repo(&self, meta: Repository, default_branch: &str, files: &[(&str, &str)]) {
        let tree: Tree = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
            .collect();
        let mut branches = BTreeMap::new();
        branches.insert(default_branch.to_string(), tree);
        self.state.borrow_mut().repos.push(RemoteRepo {
            meta,
            branches,
            default_branch: default_branch.to_string(),
        });
    }

    pub fn add_branch(&self, repo: &str, branch: &str) {
        let mut st = self.state.borrow_mut();
        if let Some(r) = st.repos.iter_mut().find(|r| r.meta.name == repo) {
            let tree = r.branches.get(&r.default_branch).cloned().unwrap_or_default();
            r.branches.insert(branch.to_string(), tree);
        }
    }

    pub fn set_quota(&self, remaining: u32) {
        self.state.borrow_mut().quota = Some(remaining);
    }

    /// Make every call of `op` fail with a 500.
    pub fn fail(&self, op: &'static str) {
        self.state.borrow_mut().failing.insert(op);
    }

    /// Accept updates without changing the stored content.
    pub fn freeze_writes(&self) {
        self.state.borrow_mut().frozen_writes = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{} ", op);
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    pub fn file(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        let st = self.state.borrow();
        let r = st.repos.iter().find(|r| r.meta.name == repo)?;
        let bytes = r.branches.get(branch)?.get(path)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn branches(&self, repo: &str) -> Vec<String> {
        let st = self.state.borrow();
        st.repos
            .iter()
            .find(|r| r.meta.name == repo)
            .map(|r| r.branches.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Opened pull requests as `(repo, head, base)`.
    pub fn pulls(&self) -> Vec<(String, String, String)> {
        self.state.borrow().pulls.clone()
    }

    fn record(&self, op: &'static str, detail: String) -> Result<(), ApiError> {
        let mut st = self.state.borrow_mut();
        st.calls.push(format!("{} {}", op, detail));
        if st.failing.contains(op) {
            return Err(ApiError::Status {
                path: op.to_string(),
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn with_branch<T>(
        &self,
        repo: &str,
        branch: &str,
        f: impl FnOnce(&mut Tree) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut st = self.state.borrow_mut();
        let r = st
            .repos
            .iter_mut()
            .find(|r| r.meta.name == repo)
            .ok_or_else(|| not_found(repo))?;
        let tree = r
            .branches
            .get_mut(branch)
            .ok_or_else(|| not_found(format!("{}@{}", repo, branch)))?;
        f(tree)
    }
}

impl HostingClient for FakeHost {
    fn list_user_repos(&self, user: &str, page: u32, per_page: u8) -> Result<RepoPage, ApiError> {
        self.record("list_user_repos", format!("{} page={}", user, page))?;
        let st = self.state.borrow();
        let all: Vec<Repository> = st.repos.iter().map(|r| r.meta.clone()).collect();
        let size = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1) * size;
        let repos: Vec<Repository> = all.iter().skip(start).take(size).cloned().collect();
        let next_page = (start + size < all.len()).then_some(page + 1);
        Ok(RepoPage {
            repos,
            remaining_quota: st.quota,
            next_page,
        })
    }

    fn get_contents(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents, ApiError> {
        self.record(
            "get_contents",
            format!("{} {}@{}", repo, path, git_ref.unwrap_or("-")),
        )?;
        let st = self.state.borrow();
        let r = st
            .repos
            .iter()
            .find(|r| r.meta.name == repo)
            .ok_or_else(|| not_found(repo))?;
        let branch = git_ref.unwrap_or(&r.default_branch);
        let tree = r.branches.get(branch).ok_or_else(|| not_found(path))?;

        if let Some(content) = tree.get(path) {
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            return Ok(Contents::File(RemoteFile {
                name,
                path: path.to_string(),
                sha: blob_sha(content),
                content: content.clone(),
            }));
        }

        let prefix = format!("{}/", path);
        let mut entries = Vec::new();
        let mut dirs = BTreeSet::new();
        for (p, content) in tree.range(prefix.clone()..) {
            let Some(rest) = p.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
                None => entries.push(DirEntry {
                    name: rest.to_string(),
                    path: p.clone(),
                    sha: blob_sha(content),
                    kind: EntryKind::File,
                }),
            }
        }
        for dir in dirs {
            entries.push(DirEntry {
                path: format!("{}{}", prefix, dir),
                name: dir,
                sha: String::new(),
                kind: EntryKind::Dir,
            });
        }
        if entries.is_empty() {
            return Err(not_found(path));
        }
        Ok(Contents::Dir(entries))
    }

    fn create_file(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        self.record("create_file", format!("{} {}@{}", repo, path, change.branch))?;
        let content = change.content.unwrap_or_default().to_vec();
        self.with_branch(repo, change.branch, |tree| {
            if tree.contains_key(path) {
                return Err(unprocessable(path, "\"sha\" wasn't supplied."));
            }
            tree.insert(path.to_string(), content);
            Ok(())
        })
    }

    fn update_file(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        self.record("update_file", format!("{} {}@{}", repo, path, change.branch))?;
        let frozen = self.state.borrow().frozen_writes;
        let content = change.content.unwrap_or_default().to_vec();
        self.with_branch(repo, change.branch, |tree| {
            let current = tree.get(path).ok_or_else(|| not_found(path))?;
            if Some(blob_sha(current).as_str()) != change.sha {
                return Err(unprocessable(path, "sha does not match"));
            }
            if !frozen {
                tree.insert(path.to_string(), content);
            }
            Ok(())
        })
    }

    fn delete_file(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        change: &FileChange<'_>,
    ) -> Result<(), ApiError> {
        self.record("delete_file", format!("{} {}@{}", repo, path, change.branch))?;
        self.with_branch(repo, change.branch, |tree| {
            let current = tree.get(path).ok_or_else(|| not_found(path))?;
            if Some(blob_sha(current).as_str()) != change.sha {
                return Err(unprocessable(path, "sha does not match"));
            }
            tree.remove(path);
            Ok(())
        })
    }

    fn get_ref(&self, _owner: &str, repo: &str, branch: &str) -> Result<GitRef, ApiError> {
        self.record("get_ref", format!("{} {}", repo, branch))?;
        self.with_branch(repo, branch, |_| {
            Ok(GitRef {
                name: format!("refs/heads/{}", branch),
                sha: format!("commit:{}", branch),
            })
        })
    }

    fn create_ref(
        &self,
        _owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), ApiError> {
        self.record("create_ref", format!("{} {}", repo, branch))?;
        let mut st = self.state.borrow_mut();
        let r = st
            .repos
            .iter_mut()
            .find(|r| r.meta.name == repo)
            .ok_or_else(|| not_found(repo))?;
        if r.branches.contains_key(branch) {
            return Err(unprocessable(branch, "Reference already exists"));
        }
        let source = sha.strip_prefix("commit:").unwrap_or(sha);
        let tree = r
            .branches
            .get(source)
            .cloned()
            .ok_or_else(|| unprocessable(sha, "Object does not exist"))?;
        r.branches.insert(branch.to_string(), tree);
        Ok(())
    }

    fn delete_ref(&self, _owner: &str, repo: &str, branch: &str) -> Result<(), ApiError> {
        self.record("delete_ref", format!("{} {}", repo, branch))?;
        let mut st = self.state.borrow_mut();
        let r = st
            .repos
            .iter_mut()
            .find(|r| r.meta.name == repo)
            .ok_or_else(|| not_found(repo))?;
        r.branches
            .remove(branch)
            .map(|_| ())
            .ok_or_else(|| unprocessable(branch, "Reference does not exist"))
    }

    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest<'_>,
    ) -> Result<PullRequest, ApiError> {
        self.record(
            "create_pull_request",
            format!("{} {}->{}", repo, pr.head, pr.base),
        )?;
        let mut st = self.state.borrow_mut();
        st.pulls
            .push((repo.to_string(), pr.head.to_string(), pr.base.to_string()));
        let number = st.pulls.len() as u64;
        Ok(PullRequest {
            number,
            html_url: format!("https://github.com/{}/{}/pull/{}", owner, repo, number),
        })
    }

    fn merge_pull_request(
        &self,
        _owner: &str,
        repo: &str,
        number: u64,
        _commit_title: &str,
    ) -> Result<(), ApiError> {
        self.record("merge_pull_request", format!("{} #{}", repo, number))?;
        let mut st = self.state.borrow_mut();
        let (_, head, base) = st
            .pulls
            .get(number as usize - 1)
            .cloned()
            .ok_or_else(|| not_found(format!("pull #{}", number)))?;
        let r = st
            .repos
            .iter_mut()
            .find(|r| r.meta.name == repo)
            .ok_or_else(|| not_found(repo))?;
        let tree = r.branches.get(&head).cloned().ok_or_else(|| not_found(head))?;
        r.branches.insert(base, tree);
        Ok(())
    }

    fn list_branches(&self, _owner: &str, repo: &str) -> Result<Vec<String>, ApiError> {
        self.record("list_branches", repo.to_string())?;
        Ok(self.branches(repo))
    }
}
