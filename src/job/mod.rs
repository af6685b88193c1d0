//! The per-repository unit of work.
//!
//! A [`Job`] carries everything that stays fixed for a run (user, working
//! branch name, strategy) together with the [`Session`] that is reset before
//! each repository, and the [`Tally`] the driver reports at the end.

pub mod filter;
pub mod finalize;
pub mod outcome;
pub mod reconcile;
pub mod session;

use anyhow::{Context, Result};
use tracing::debug;

use crate::github::{HostingClient, Repository};
use crate::progress::ScopePrinter;
use crate::templates::TemplateSet;
use finalize::{Terminal, finalize};
use reconcile::Reconciler;
use session::{BRANCH_PREFIX, Session};

/// What a job does with each in-scope repository.
#[derive(Debug)]
pub enum Strategy {
    /// Reconcile `.github/workflows` against the templates and raise a PR.
    SyncWorkflows { templates: TemplateSet, merge: bool },
    /// Delete branches left behind by earlier runs.
    PruneBranches,
}

/// Aggregated results of a run.
#[derive(Debug, Default)]
pub struct Tally {
    /// Repositories that passed the filter.
    pub processed: usize,
    pub skipped: usize,
    /// `(repository, error)` for every repository-fatal failure.
    pub failed: Vec<(String, String)>,
    pub pull_requests: Vec<String>,
    pub pruned: usize,
    /// Remaining quota when listing was stopped early.
    pub quota_exhausted: Option<u32>,
}

#[derive(Debug)]
pub struct Job {
    strategy: Strategy,
    session: Session,
    tally: Tally,
}

impl Job {
    pub fn sync(
        user: impl Into<String>,
        branch: impl Into<String>,
        templates: TemplateSet,
        merge: bool,
    ) -> Self {
        Self {
            strategy: Strategy::SyncWorkflows { templates, merge },
            session: Session::new(user, branch),
            tally: Tally::default(),
        }
    }

    pub fn prune(user: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::PruneBranches,
            session: Session::new(user, ""),
            tally: Tally::default(),
        }
    }

    pub fn user(&self) -> &str {
        self.session.user()
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Prepare for the next repository.
    pub fn next(&mut self) {
        self.session.reset();
    }

    /// Number of pull requests opened so far.
    pub fn counter(&self) -> usize {
        self.tally.pull_requests.len()
    }

    pub fn pr_urls(&self) -> &[String] {
        &self.tally.pull_requests
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }

    /// Run the strategy on one repository that passed the filter.
    ///
    /// Repository-fatal failures are reported and recorded in the tally; only
    /// failures that must stop the whole run are returned as `Err`.
    pub fn process(
        &mut self,
        client: &dyn HostingClient,
        repo: &Repository,
        printer: &ScopePrinter,
    ) -> Result<()> {
        self.tally.processed += 1;
        match &self.strategy {
            Strategy::SyncWorkflows { templates, merge } => {
                let step = printer.nested("---");
                let result =
                    Reconciler::new(client, &mut self.session, &repo.name, step).run(templates);
                let terminal = finalize(client, &self.session, &repo.name, result, *merge, printer)
                    .with_context(|| format!("repository '{}'", repo.name))?;
                debug!(repo = %repo.name, ?terminal, "repository finished");
                self.record(&repo.name, terminal, printer);
            }
            Strategy::PruneBranches => {
                match prune(client, self.session.user(), &repo.name, printer) {
                    Ok(0) => printer.skipped("No robot branches"),
                    Ok(n) => self.tally.pruned += n,
                    Err(e) => {
                        printer.error(format!("{:#}", e));
                        self.tally.failed.push((repo.name.clone(), format!("{:#}", e)));
                    }
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, repo: &str, terminal: Terminal, printer: &ScopePrinter) {
        match terminal {
            Terminal::Unchanged => printer.skipped("Workflow files are up to date"),
            Terminal::BranchDeleted => {}
            Terminal::PrOpened(pr) | Terminal::PrMerged(pr) => {
                self.tally.pull_requests.push(pr.html_url)
            }
            Terminal::Failed {
                error,
                pull_request,
            } => {
                if let Some(pr) = pull_request {
                    self.tally.pull_requests.push(pr.html_url);
                }
                printer.error(format!("{:#}", error));
                self.tally.failed.push((repo.to_string(), format!("{:#}", error)));
            }
        }
    }
}

/// Delete every branch of `repo` created by an earlier run.
///
/// Returns how many branches were removed; stops at the first failure.
pub fn prune(
    client: &dyn HostingClient,
    user: &str,
    repo: &str,
    printer: &ScopePrinter,
) -> Result<usize> {
    let branches = client
        .list_branches(user, repo)
        .context("error listing branches")?;
    let mut removed = 0;
    for branch in branches.iter().filter(|b| b.contains(BRANCH_PREFIX)) {
        client
            .delete_ref(user, repo, branch)
            .with_context(|| format!("error deleting branch '{}'", branch))?;
        printer.ok(format!("Branch '{}' deleted", branch));
        removed += 1;
    }
    Ok(removed)
}
