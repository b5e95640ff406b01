//! Copying template pieces an existing project lacks. Nothing that
//! already exists in the project is modified or merged into.

use crate::{
    copy,
    metadata,
    project::ProjectMetadata,
    template::{TemplateTree, OPTIONAL_DIRS},
};
use std::{fs, io, path::Path};
use tracing::{info, warn};

pub const README: &str = "README.md";
pub const GITIGNORE: &str = ".gitignore";

#[derive(Debug, Default)]
pub struct BackfillReport {
    /// Human readable names of what was copied.
    pub copied: Vec<String>,
    pub errors: Vec<String>,
}

impl BackfillReport {
    /// Lines to show the user: what was copied and what failed, or a
    /// single line saying nothing was missing.
    pub fn summary(&self) -> Vec<String> {
        let lines: Vec<String> = self
            .copied
            .iter()
            .cloned()
            .chain(self.errors.iter().map(|e| format!("Error: {}", e)))
            .collect();
        if lines.is_empty() {
            vec!["No missing files found".to_string()]
        } else {
            lines
        }
    }

    fn failed(&mut self, what: &str, err: impl std::fmt::Display) {
        warn!("Error copying {}: {}", what, err);
        self.errors.push(format!("{}: {}", what, err));
    }
}

fn copy_readme(from: &Path, to: &Path, meta: &ProjectMetadata) -> io::Result<()> {
    fs::copy(from, to)?;
    metadata::rewrite_file(to, |text| metadata::substitute_readme(text, meta))?;
    Ok(())
}

/// Copies `firmware/`, `3d-print/`, `cad/`, `.github/`, `README.md` and
/// `.gitignore` from the template into `project_root`, each only if the
/// project does not have it yet.
pub fn copy_missing_template_files(
    template: &TemplateTree,
    project_root: &Path,
    meta: &ProjectMetadata,
) -> BackfillReport {
    let mut report = BackfillReport::default();
    if !template.exists() {
        report.failed("template", format!("not found at {}", template.root().display()));
        return report;
    }

    for dir in OPTIONAL_DIRS {
        let from = template.root().join(dir);
        let to = project_root.join(dir);
        if !from.is_dir() || to.exists() {
            continue;
        }
        match copy::copy_tree(&from, &to) {
            Ok(()) => report.copied.push(format!("{}/ (complete folder)", dir)),
            Err(err) => report.failed(dir, err),
        }
    }

    let from = template.root().join(README);
    let to = project_root.join(README);
    if from.is_file() && !to.exists() {
        match copy_readme(&from, &to, meta) {
            Ok(()) => report.copied.push(README.to_string()),
            Err(err) => report.failed(README, err),
        }
    }

    let from = template.root().join(GITIGNORE);
    let to = project_root.join(GITIGNORE);
    if from.is_file() && !to.exists() {
        match fs::copy(&from, &to) {
            Ok(_) => report.copied.push(GITIGNORE.to_string()),
            Err(err) => report.failed(GITIGNORE, err),
        }
    }

    info!("Backfilled {} item(s) into {}", report.copied.len(), project_root.display());
    report
}
