use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Every working branch starts with this prefix; `prune` looks for it.
pub const BRANCH_PREFIX: &str = "robot-works-";

/// Base branch tried first.
pub const PRIMARY_BASE: &str = "main";
/// Base branch tried once when the primary one does not exist.
pub const SECONDARY_BASE: &str = "master";

/// Timestamp layout that is valid inside a ref name (no colons, no spaces).
const BRANCH_TIME_FORMAT: &str = "%Y-%m-%dT%H%M%S%z";

/// Build the working branch name for a run started at `at`.
pub fn branch_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}{}", BRANCH_PREFIX, at.format(BRANCH_TIME_FORMAT))
}

/// Per-repository mutable state of a run.
///
/// The branch name is fixed for the whole run; the branch-created flag and
/// the base-branch guess belong to the repository being processed and are
/// cleared by [`Session::reset`] before the next one.
#[derive(Debug, Clone)]
pub struct Session {
    user: String,
    branch: String,
    base: String,
    branch_created: bool,
}

impl Session {
    pub fn new(user: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            branch: branch.into(),
            base: PRIMARY_BASE.to_string(),
            branch_created: false,
        }
    }

    pub fn reset(&mut self) {
        self.branch_created = false;
        self.base = PRIMARY_BASE.to_string();
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn branch_created(&self) -> bool {
        self.branch_created
    }

    pub(crate) fn mark_branch_created(&mut self) {
        self.branch_created = true;
    }

    /// Switch to the secondary base branch.
    ///
    /// Returns `false` if the secondary one is already in use, so the
    /// fallback happens at most once per repository.
    pub(crate) fn fall_back_base(&mut self) -> bool {
        if self.base == SECONDARY_BASE {
            return false;
        }
        self.base = SECONDARY_BASE.to_string();
        true
    }
}
