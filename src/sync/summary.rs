use crate::job::{Job, Strategy, Tally};
use crate::progress::{ScopePrinter, banner};

pub fn print(job: &Job) {
    println!();
    println!("{}", banner("Finished"));

    let printer = ScopePrinter::default();
    let tally = job.tally();
    printer.info(counts(tally));

    match job.strategy() {
        Strategy::SyncWorkflows { .. } => {
            if job.counter() == 0 {
                printer.info("No Pull Requests created in Go repositories by this job");
            } else {
                printer.ok(format!(
                    "{} Pull Requests created in Go repositories",
                    job.counter()
                ));
                let item = printer.nested("--");
                for url in job.pr_urls() {
                    item.info(url);
                }
            }
        }
        Strategy::PruneBranches => printer.ok(format!("{} branches deleted", tally.pruned)),
    }

    if !tally.failed.is_empty() {
        printer.error(format!("{} repositories failed", tally.failed.len()));
        let item = printer.nested("--");
        for (repo, err) in &tally.failed {
            item.error(format!("{}: {}", repo, err));
        }
    }

    if let Some(remaining) = tally.quota_exhausted {
        printer.error(format!(
            "Stopped early: API quota dropped to {}; remaining repositories were not visited",
            remaining
        ));
    }
}

fn counts(tally: &Tally) -> String {
    format!(
        "{} repositories processed, {} skipped, {} failed",
        tally.processed,
        tally.skipped,
        tally.failed.len()
    )
}
