use anyhow::{Context, Error, Result};

use super::outcome::Outcome;
use super::session::Session;
use crate::github::{HostingClient, NewPullRequest, PullRequest};
use crate::progress::ScopePrinter;

pub const PR_TITLE: &str = "Update Workflow YAML files";
pub const PR_BODY: &str = "This PR updates workflow files.";
pub const MERGE_TITLE: &str = "Merging PR";

/// How a repository run ended.
#[derive(Debug)]
pub enum Terminal {
    /// Nothing to do and no branch was ever created.
    Unchanged,
    /// A speculative branch turned out to be unnecessary and was removed.
    BranchDeleted,
    PrOpened(PullRequest),
    PrMerged(PullRequest),
    /// The repository failed; the run may continue with the next one.
    /// A pull request that was opened before the failure is kept.
    Failed {
        error: Error,
        pull_request: Option<PullRequest>,
    },
}

/// Decide and perform the terminal step of a repository run.
///
/// `result` is what reconciliation produced. The returned `Err` is reserved
/// for failures that leave a working branch behind with no pull request
/// attached to it; the caller treats those as fatal to the whole run.
pub fn finalize(
    client: &dyn HostingClient,
    session: &Session,
    repo: &str,
    result: Result<Outcome>,
    merge: bool,
    printer: &ScopePrinter,
) -> Result<Terminal> {
    match result {
        Err(error) => fail(client, session, repo, error, printer),
        Ok(outcome) if !outcome.changed() => {
            if !session.branch_created() {
                return Ok(Terminal::Unchanged);
            }
            client
                .delete_ref(session.user(), repo, session.branch())
                .with_context(|| format!("error deleting branch '{}'", session.branch()))?;
            printer.info(format!(
                "No updates made. Branch '{}' deleted.",
                session.branch()
            ));
            Ok(Terminal::BranchDeleted)
        }
        Ok(outcome) => {
            printer.info(format!("Changes: {}", outcome));
            open_pull_request(client, session, repo, merge, printer)
        }
    }
}

/// Record a repository failure, removing the working branch if one exists.
///
/// When the branch cannot be removed the deletion error is wrapped around
/// the original one and returned as `Err`, so both reach the user.
fn fail(
    client: &dyn HostingClient,
    session: &Session,
    repo: &str,
    error: Error,
    printer: &ScopePrinter,
) -> Result<Terminal> {
    if session.branch_created() {
        let branch = session.branch();
        if let Err(del) = client.delete_ref(session.user(), repo, branch) {
            return Err(error.context(format!("error deleting branch '{}': {}", branch, del)));
        }
        printer.info(format!("Branch '{}' deleted after failure.", branch));
    }
    Ok(Terminal::Failed {
        error,
        pull_request: None,
    })
}

fn open_pull_request(
    client: &dyn HostingClient,
    session: &Session,
    repo: &str,
    merge: bool,
    printer: &ScopePrinter,
) -> Result<Terminal> {
    let request = NewPullRequest {
        title: PR_TITLE,
        body: PR_BODY,
        head: session.branch(),
        base: session.base(),
        maintainer_can_modify: true,
    };
    let pr = match client.create_pull_request(session.user(), repo, &request) {
        Ok(pr) => pr,
        Err(e) => {
            let error = Error::new(e).context("error creating pull request");
            return fail(client, session, repo, error, printer);
        }
    };
    printer.ok(format!("Pull request created: {}", pr.html_url));

    if !merge {
        return Ok(Terminal::PrOpened(pr));
    }

    if let Err(e) = client.merge_pull_request(session.user(), repo, pr.number, MERGE_TITLE) {
        return Ok(Terminal::Failed {
            error: Error::new(e).context("error merging pull request"),
            pull_request: Some(pr),
        });
    }
    printer.ok(format!("Pull request #{} merged", pr.number));

    if let Err(e) = client.delete_ref(session.user(), repo, session.branch()) {
        return Ok(Terminal::Failed {
            error: Error::new(e).context(format!(
                "error deleting branch after pr was merged '{}'",
                session.branch()
            )),
            pull_request: Some(pr),
        });
    }
    printer.info(format!("Branch '{}' deleted.", session.branch()));
    Ok(Terminal::PrMerged(pr))
}
