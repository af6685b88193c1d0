//! Reconciliation of one repository's workflow directory.
//!
//! The engine lists `.github/workflows`, plans one action per file and applies
//! the plan on a working branch that is only created once a real mutation is
//! needed. A repository whose files already match never gets a branch.

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::outcome::{Effect, Outcome};
use super::session::Session;
use crate::github::{
    Contents, DirEntry, EntryKind, FileChange, GitRef, HostingClient, RemoteFile,
};
use crate::paths::{WORKFLOWS_DIR, workflow_path};
use crate::progress::ScopePrinter;
use crate::templates::TemplateSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
    Create,
}

impl Action {
    fn requires_content(self) -> bool {
        matches!(self, Action::Update | Action::Create)
    }

    fn gerund(self) -> &'static str {
        match self {
            Action::Update => "updating",
            Action::Delete => "deleting",
            Action::Create => "creating",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Create => "create",
        }
    }
}

/// One scheduled file action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned {
    pub action: Action,
    /// Template / file name, used for messages and template lookup.
    pub name: String,
    /// Repository path the action applies to.
    pub path: String,
}

/// Compute the actions that bring `existing` in line with `templates`.
///
/// Existing files come first in listing order (update when a template of the
/// same name exists, delete otherwise), followed by creates for every
/// template that had no counterpart.
pub fn plan(templates: &TemplateSet, existing: &[DirEntry]) -> Vec<Planned> {
    let mut to_create: Vec<&str> = templates.names().collect();
    let mut planned = Vec::with_capacity(existing.len() + to_create.len());

    for entry in existing {
        let action = if templates.contains(&entry.name) {
            to_create.retain(|n| *n != entry.name);
            Action::Update
        } else {
            Action::Delete
        };
        planned.push(Planned {
            action,
            name: entry.name.clone(),
            path: entry.path.clone(),
        });
    }

    planned.extend(to_create.into_iter().map(|name| Planned {
        action: Action::Create,
        name: name.to_string(),
        path: workflow_path(name),
    }));
    planned
}

/// Applies a reconciliation plan to one repository.
pub struct Reconciler<'a> {
    client: &'a dyn HostingClient,
    session: &'a mut Session,
    repo: &'a str,
    printer: ScopePrinter,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        client: &'a dyn HostingClient,
        session: &'a mut Session,
        repo: &'a str,
        printer: ScopePrinter,
    ) -> Self {
        Self {
            client,
            session,
            repo,
            printer,
        }
    }

    /// Reconcile the workflow directory against `templates`.
    ///
    /// # Errors
    /// The first failing action aborts the run; the error names the action
    /// and the file. Whatever branch was already created stays recorded in
    /// the session so the finalizer can remove it.
    pub fn run(&mut self, templates: &TemplateSet) -> Result<Outcome> {
        let existing = self.existing_files()?;
        let mut outcome = Outcome::empty();

        for step in plan(templates, &existing) {
            self.printer
                .info(format!("Processing file '{}' ({})", step.name, step.action.verb()));
            let content = templates.get(&step.name).unwrap_or_default();
            let done = self
                .apply(step.action, &step.path, content)
                .with_context(|| format!("unable to {} '{}'", step.action.verb(), step.name))?;
            outcome.merge(done);
        }
        Ok(outcome)
    }

    fn existing_files(&self) -> Result<Vec<DirEntry>> {
        let listing = self
            .client
            .get_contents(self.session.user(), self.repo, WORKFLOWS_DIR, None);
        match listing {
            Ok(Contents::Dir(entries)) => {
                let files: Vec<DirEntry> = entries
                    .into_iter()
                    .filter(|e| e.kind == EntryKind::File)
                    .collect();
                self.printer
                    .info(format!("Found {} files in {}", files.len(), WORKFLOWS_DIR));
                Ok(files)
            }
            Ok(Contents::File(_)) => bail!("'{}' is a file, not a directory", WORKFLOWS_DIR),
            Err(e) if e.is_not_found() => {
                self.printer
                    .skipped(format!("No {} directory found.", WORKFLOWS_DIR));
                Ok(Vec::new())
            }
            Err(e) => Err(e).context("error getting contents"),
        }
    }

    /// Perform one file action, creating the working branch on demand.
    pub fn apply(&mut self, action: Action, path: &str, content: &[u8]) -> Result<Outcome> {
        if action.requires_content() && content.is_empty() {
            bail!("content cannot be empty upon {} a file", action.gerund());
        }

        let outcome = match action {
            Action::Update => self.update(path, content)?,
            Action::Delete => self.delete(path)?,
            Action::Create => self.create(path, content)?,
        };
        let item = self.printer.nested("--");
        let mut shown = outcome;
        shown.remove(Effect::Skipped);
        for effect in shown.iter() {
            item.ok(effect);
        }
        Ok(outcome)
    }

    fn update(&mut self, path: &str, content: &[u8]) -> Result<Outcome> {
        let current = self.current_file(path)?;
        if current.content == content {
            self.printer.nested("--").skipped("Content is the same.");
            return Ok(Effect::Skipped.into());
        }

        self.ensure_branch()?;
        let change = FileChange {
            message: format!("Update {}", path),
            branch: self.session.branch(),
            content: Some(content),
            sha: Some(&current.sha),
        };
        self.client
            .update_file(self.session.user(), self.repo, path, &change)
            .context("error updating file")?;

        let written = self
            .fetch_file(path, Some(self.session.branch()))
            .context("error retrieving updated file")?;
        if written.content != current.content {
            Ok(Effect::Updated.into())
        } else {
            self.printer
                .nested("--")
                .skipped("Write accepted but content did not change.");
            Ok(Outcome::empty())
        }
    }

    fn delete(&mut self, path: &str) -> Result<Outcome> {
        let current = self.current_file(path)?;
        self.ensure_branch()?;
        let change = FileChange {
            message: format!("Delete {}", path),
            branch: self.session.branch(),
            content: None,
            sha: Some(&current.sha),
        };
        self.client
            .delete_file(self.session.user(), self.repo, path, &change)
            .context("error deleting file")?;
        Ok(Effect::Deleted.into())
    }

    fn create(&mut self, path: &str, content: &[u8]) -> Result<Outcome> {
        self.ensure_branch()?;
        let change = FileChange {
            message: format!("Create {}", path),
            branch: self.session.branch(),
            content: Some(content),
            sha: None,
        };
        self.client
            .create_file(self.session.user(), self.repo, path, &change)
            .context("error creating file")?;
        Ok(Effect::Created.into())
    }

    /// Read a file from the working branch once it exists, else from the
    /// default branch.
    fn current_file(&self, path: &str) -> Result<RemoteFile> {
        let at = self
            .session
            .branch_created()
            .then(|| self.session.branch());
        self.fetch_file(path, at).context("error retrieving file")
    }

    fn fetch_file(&self, path: &str, git_ref: Option<&str>) -> Result<RemoteFile> {
        match self
            .client
            .get_contents(self.session.user(), self.repo, path, git_ref)?
        {
            Contents::File(f) => Ok(f),
            Contents::Dir(_) => bail!("'{}' is a directory", path),
        }
    }

    fn ensure_branch(&mut self) -> Result<()> {
        if self.session.branch_created() {
            return Ok(());
        }
        let base = self.base_commit()?;
        debug!(repo = self.repo, base = %base.name, sha = %base.sha, "creating working branch");
        self.client
            .create_ref(self.session.user(), self.repo, self.session.branch(), &base.sha)
            .context("error creating new branch")?;
        self.session.mark_branch_created();
        self.printer
            .nested("--")
            .ok(format!("Branch '{}' created", self.session.branch()));
        Ok(())
    }

    /// Latest commit of the base branch, falling back to the secondary base
    /// name once when the primary one does not exist.
    fn base_commit(&mut self) -> Result<GitRef> {
        let first = self
            .client
            .get_ref(self.session.user(), self.repo, self.session.base());
        let found = match first {
            Err(e) if e.is_not_found() && self.session.fall_back_base() => self
                .client
                .get_ref(self.session.user(), self.repo, self.session.base()),
            other => other,
        };
        Ok(found.context("error getting base branch ref")?)
    }
}
