mod summary;

use anyhow::{Context, Result, bail};
use chrono::Local;
use tracing::{info, warn};

use crate::config::{self, Overrides, QuotaGuard, QuotaPolicy};
use crate::github::{GithubClient, HostingClient, Repository};
use crate::job::Job;
use crate::job::filter::{Verdict, inspect};
use crate::job::session::branch_name;
use crate::progress::ScopePrinter;
use crate::templates::TemplateSet;

/// Repositories requested per listing page.
pub const PAGE_SIZE: u8 = 30;

/// Reconcile workflow files in every Go repository of the configured user.
///
/// High-level flow:
/// 1. Resolve settings (config file, flags, `GITHUB_TOKEN`) and load templates.
/// 2. Pick one working branch name for the whole run.
/// 3. Walk the user's repositories page by page (see [`run`]).
/// 4. Print the summary: pull requests opened, failed repositories.
pub fn cmd_sync(cli: &Overrides, merge: bool) -> Result<()> {
    let settings = config::load(cli, merge)?;
    let templates = TemplateSet::load(&settings.templates)?;
    let client = GithubClient::new(&settings.api_url, &settings.token)?;

    let branch = branch_name(&Local::now());
    info!(user = %settings.user, %branch, templates = templates.len(), "starting sync");

    let mut job = Job::sync(settings.user, branch, templates, settings.merge);
    run(&client, &mut job, settings.quota)?;
    summary::print(&job);
    Ok(())
}

/// Delete `robot-works-*` branches left in the user's Go repositories.
pub fn cmd_prune(cli: &Overrides) -> Result<()> {
    let settings = config::load(cli, false)?;
    let client = GithubClient::new(&settings.api_url, &settings.token)?;
    info!(user = %settings.user, "starting prune");

    let mut job = Job::prune(settings.user);
    run(&client, &mut job, settings.quota)?;
    summary::print(&job);
    Ok(())
}

/// Drive `job` over every repository of its user.
///
/// The quota reported with each page is checked before the page is
/// processed. Only listing failures, the `fail` quota policy and errors the
/// job itself deems run-fatal stop the walk.
pub fn run(client: &dyn HostingClient, job: &mut Job, guard: QuotaGuard) -> Result<()> {
    let printer = ScopePrinter::default();
    printer.info(format!(
        "Fetching all Go repositories for user '{}'",
        job.user()
    ));

    let mut page = 1;
    loop {
        let listing = client
            .list_user_repos(job.user(), page, PAGE_SIZE)
            .context("error listing repositories")?;

        if let Some(remaining) = listing.remaining_quota {
            if remaining < guard.floor {
                match guard.policy {
                    QuotaPolicy::Stop => {
                        warn!(remaining, floor = guard.floor, "quota floor reached");
                        printer.error(format!(
                            "Rate limit reached. Remaining Quota: {}",
                            remaining
                        ));
                        job.tally_mut().quota_exhausted = Some(remaining);
                        break;
                    }
                    QuotaPolicy::Fail => bail!(
                        "remaining API quota {} is below the floor of {}",
                        remaining,
                        guard.floor
                    ),
                }
            }
            printer.info(format!("Remaining Quota: {}", remaining));
        }

        for repo in &listing.repos {
            visit(client, job, repo, &printer)?;
        }

        match listing.next_page {
            Some(next) => page = next,
            None => break,
        }
    }
    Ok(())
}

fn visit(
    client: &dyn HostingClient,
    job: &mut Job,
    repo: &Repository,
    printer: &ScopePrinter,
) -> Result<()> {
    printer.info(format!("Processing repository '{}'", repo.name));
    job.next();

    let item = ScopePrinter::new("-");
    match inspect(client, job.user(), repo) {
        Verdict::Accept => {
            item.info("Golang package/project detected");
            job.process(client, repo, &item)
        }
        Verdict::Skip(reason) => {
            item.skipped(reason);
            job.tally_mut().skipped += 1;
            Ok(())
        }
        Verdict::Error(message) => {
            item.error(&message);
            job.tally_mut().failed.push((repo.name.clone(), message));
            Ok(())
        }
    }
}
