//! Rebuild the toolbox staging tree from the project sources.
//!
//! The run is a fixed sequence: wipe the staging root, recreate the layout,
//! drop stale compiled extensions, copy every manifest rule in order, then
//! copy the root files. The first failure stops the run and leaves whatever
//! was already copied in place.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::discovery::{matching_files, tree_files, FileGlob};
use crate::manifest::{CopyRule, ToolboxManifest};

/// What one rule copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub source: PathBuf,
    pub pattern: Option<String>,
    pub destination: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    pub toolbox_dir: PathBuf,
    pub removed_staging_root: bool,
    pub created_directories: Vec<PathBuf>,
    pub removed_artifacts: Vec<PathBuf>,
    pub rules: Vec<RuleOutcome>,
    pub root_files: Vec<PathBuf>,
}

impl PopulateReport {
    pub fn copied_files(&self) -> usize {
        self.rules.iter().map(|r| r.files.len()).sum::<usize>() + self.root_files.len()
    }
}

#[derive(Debug, Clone)]
pub struct Populator {
    manifest: ToolboxManifest,
    project_root: PathBuf,
    toolbox_dir: PathBuf,
}

impl Populator {
    pub fn new(
        manifest: ToolboxManifest,
        project_root: impl Into<PathBuf>,
        toolbox_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest,
            project_root: project_root.into(),
            toolbox_dir: toolbox_dir.into(),
        }
    }

    /// The usual layout: the toolbox directory sits inside the project root.
    pub fn for_toolbox(toolbox_dir: impl Into<PathBuf>) -> Self {
        let toolbox_dir = toolbox_dir.into();
        let project_root = toolbox_dir.join("..");
        Self::new(ToolboxManifest::default(), project_root, toolbox_dir)
    }

    pub fn manifest(&self) -> &ToolboxManifest {
        &self.manifest
    }

    pub fn run(&self) -> Result<PopulateReport> {
        self.manifest.validate()?;
        self.ensure_staging_is_disjoint()?;

        let mut report = PopulateReport {
            toolbox_dir: self.toolbox_dir.clone(),
            ..PopulateReport::default()
        };

        report.removed_staging_root = self.reset_staging_root()?;
        report.created_directories = self.create_directories()?;
        report.removed_artifacts = self.remove_stale_artifacts()?;

        for rule in &self.manifest.rules {
            let outcome = self.apply_rule(rule)?;
            tracing::info!(
                source = %rule.source.display(),
                destination = %rule.destination.display(),
                files = outcome.files.len(),
                "copied"
            );
            report.rules.push(outcome);
        }

        for file in &self.manifest.root_files {
            let from = self.project_root.join(&file.source);
            let to = self.toolbox_dir.join(&file.destination);
            copy_file(&from, &to)?;
            report.root_files.push(file.destination.clone());
        }

        tracing::info!(
            toolbox = %self.toolbox_dir.display(),
            files = report.copied_files(),
            "toolbox populated"
        );
        Ok(report)
    }

    /// Refuse to run when the tree about to be wiped holds, or sits inside,
    /// something a rule or root file copies from.
    fn ensure_staging_is_disjoint(&self) -> Result<()> {
        let staging = resolve(&self.toolbox_dir.join(&self.manifest.staging_root))?;
        let sources = self
            .manifest
            .rules
            .iter()
            .map(|rule| &rule.source)
            .chain(self.manifest.root_files.iter().map(|file| &file.source));

        for source in sources {
            let source = resolve(&self.project_root.join(source))?;
            if staging.starts_with(&source) || source.starts_with(&staging) {
                return Err(anyhow!(
                    "staging root {} overlaps copy source {}",
                    staging.display(),
                    source.display()
                ));
            }
        }
        Ok(())
    }

    fn reset_staging_root(&self) -> Result<bool> {
        let root = self.toolbox_dir.join(&self.manifest.staging_root);
        if !root.exists() {
            return Ok(false);
        }
        tracing::info!(path = %root.display(), "removing staging root");
        fs::remove_dir_all(&root).with_context(|| format!("removing {}", root.display()))?;
        Ok(true)
    }

    fn create_directories(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = vec![self.manifest.staging_root.clone()];
        for dir in &self.manifest.directories {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }

        for dir in &dirs {
            let path = self.toolbox_dir.join(dir);
            fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
        }
        Ok(dirs)
    }

    fn remove_stale_artifacts(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for stale in &self.manifest.stale_artifacts {
            let glob = FileGlob::new(&stale.pattern)?;
            let dir = self.toolbox_dir.join(&stale.directory);
            for path in matching_files(&dir, &glob)? {
                tracing::debug!(path = %path.display(), "removing stale artifact");
                fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
                removed.push(path);
            }
        }
        Ok(removed)
    }

    fn apply_rule(&self, rule: &CopyRule) -> Result<RuleOutcome> {
        let source = self.project_root.join(&rule.source);
        let destination = self.toolbox_dir.join(&rule.destination);

        let files = if rule.recursive {
            copy_tree(&source, &destination)?
        } else {
            let pattern = rule
                .pattern
                .as_deref()
                .ok_or_else(|| anyhow!("rule for {} has no pattern", rule.source.display()))?;
            let glob = FileGlob::new(pattern)?;
            let mut copied = Vec::new();
            for file in matching_files(&source, &glob)? {
                let name = file
                    .file_name()
                    .ok_or_else(|| anyhow!("no file name in {}", file.display()))?;
                copy_file(&file, &destination.join(name))?;
                copied.push(PathBuf::from(name));
            }
            copied
        };

        Ok(RuleOutcome {
            source: rule.source.clone(),
            pattern: rule.pattern.clone(),
            destination: rule.destination.clone(),
            files,
        })
    }
}

/// Absolute form of `path` with symlinks resolved as far as the path exists.
fn resolve(path: &Path) -> Result<PathBuf> {
    let mut resolved = if path.is_absolute() {
        PathBuf::new()
    } else {
        env::current_dir().context("reading current directory")?
    };
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
        if let Ok(real) = fs::canonicalize(&resolved) {
            resolved = real;
        }
    }
    Ok(resolved)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    tracing::debug!(from = %from.display(), to = %to.display(), "copy");
    fs::copy(from, to)
        .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Copy the contents of `source` into `destination`, keeping relative paths.
fn copy_tree(source: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
    if !source.is_dir() {
        return Err(anyhow!("directory to copy does not exist: {}", source.display()));
    }

    let files = tree_files(source)?;
    for rel in &files {
        let to = destination.join(rel);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        copy_file(&source.join(rel), &to)?;
    }
    Ok(files)
}
