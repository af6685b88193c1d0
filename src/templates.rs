use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::config::{Overrides, load_file_config};
use crate::progress::ScopePrinter;

/// Canonical workflow files, keyed by file name.
///
/// Loaded once per run and shared read-only by every repository.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl TemplateSet {
    /// Load every regular file under `dir`, recursing into subdirectories.
    ///
    /// Only the file name becomes the key; the subdirectory a file lives in
    /// is not represented. If two files share a name, the one visited last
    /// wins and a warning is logged.
    ///
    /// # Errors
    /// - The directory cannot be read.
    /// - A file cannot be read.
    /// - No files were found at all.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        collect(dir, &mut files)
            .with_context(|| format!("error loading templates from {}", dir.display()))?;
        let set = Self { files };
        if set.is_empty() {
            bail!("no templates found in {}", dir.display());
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<N: Into<String>, C: Into<Vec<u8>>> FromIterator<(N, C)> for TemplateSet {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(n, c)| (n.into(), c.into()))
                .collect(),
        }
    }
}

fn collect(dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("cannot read directory {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for ent in entries {
        let path = ent.path();
        let meta = fs::metadata(&path)
            .with_context(|| format!("cannot stat {}", path.display()))?;
        if meta.is_dir() {
            collect(&path, files)?;
            continue;
        }
        if !meta.is_file() {
            continue;
        }
        let name = ent.file_name().to_string_lossy().into_owned();
        let bytes =
            fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
        if files.insert(name.clone(), bytes).is_some() {
            warn!(template = %name, path = %path.display(), "duplicate template name overrides an earlier file");
        }
    }
    Ok(())
}

/// CLI command: print the templates that a sync run would apply.
///
/// Example output:
/// ```text
/// [ Info    ] 2 templates in templates
/// - [ OK      ] lint.yml (412 bytes)
/// - [ OK      ] test.yml (958 bytes)
/// ```
pub fn cmd_templates(cli: &Overrides) -> Result<()> {
    let file = load_file_config(cli.config.as_deref())?;
    let dir = cli
        .templates
        .clone()
        .or(file.templates)
        .unwrap_or_else(|| crate::paths::DEFAULT_TEMPLATES_DIR.into());
    let set = TemplateSet::load(&dir)?;

    let printer = ScopePrinter::default();
    printer.info(format!("{} templates in {}", set.len(), dir.display()));
    let item = printer.nested("-");
    for (name, content) in set.iter() {
        item.ok(format!("{} ({} bytes)", name, content.len()));
    }
    Ok(())
}
