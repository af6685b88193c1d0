use crate::github::{HostingClient, Repository};
use crate::paths::MARKER_FILE;

/// Decision about whether a repository is in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Routine rejection, with the reason shown to the user.
    Skip(String),
    /// The marker probe failed for a reason other than "not found".
    Error(String),
}

/// Decide whether `repo` should be reconciled on behalf of `user`.
///
/// Cheap descriptor checks run first; the marker file probe costs one API
/// call and is only issued for candidates that pass them.
pub fn inspect(client: &dyn HostingClient, user: &str, repo: &Repository) -> Verdict {
    if repo.fork {
        return Verdict::Skip("Fork".to_string());
    }
    if repo.archived {
        return Verdict::Skip("Archived".to_string());
    }
    if repo.owner.kind != "User" {
        return Verdict::Skip(format!("Not a user repository: {}", repo.owner.kind));
    }
    if !repo.owner.login.eq_ignore_ascii_case(user) {
        return Verdict::Skip(format!("Owned by '{}'", repo.owner.login));
    }

    match client.get_contents(user, &repo.name, MARKER_FILE, None) {
        Ok(_) => Verdict::Accept,
        Err(e) if e.is_not_found() => {
            Verdict::Skip(format!("{} is not in the root directory", MARKER_FILE))
        }
        Err(e) => Verdict::Error(format!("Error getting contents: {}", e)),
    }
}
