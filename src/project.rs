//! Values a user supplies for a project, and the ways acting on them can fail.

use crate::{license::License, template::PcbTemplate};
use std::{
    fmt::Display,
    io,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;

/// Revision used when the user leaves the field empty.
pub const DEFAULT_REVISION: &str = "1.0.0";
/// Stand-in written for a blank company.
pub const NULL_COMPANY: &str = "null";

/// Input fields that can be required.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Location,
    ProjectName,
    BoardName,
    Designer,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Field::Location => "Project Location",
            Field::ProjectName => "Project Name",
            Field::BoardName => "Board Name",
            Field::Designer => "Designer",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required!")]
    Missing(Field),
    #[error("{0} must be a plain name, without path separators or '.'/'..'.")]
    NotAName(Field),
    #[error("No PCB templates found in template directory!")]
    NoPcbTemplates,
    #[error("'{0}' is not one of the available PCB templates.")]
    UnknownPcbTemplate(String),
}

/// Failures that stop an operation before (or instead of) touching files.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Template directory not found!\nExpected: '{}'", .0.display())]
    TemplateMissing(PathBuf),
    #[error(
        "Directory already exists: '{}'\nPlease choose a different name or location.",
        .0.display()
    )]
    DestinationExists(PathBuf),
    #[error("Please save the board first!")]
    BoardUnsaved,
    #[error("Project file '{}' does not exist.", .0.display())]
    ProjectFileMissing(PathBuf),
    #[error("Project file '{}' is not valid JSON: {}", .0.display(), .1)]
    ProjectFileInvalid(PathBuf, #[source] serde_json::Error),
    #[error("Could not access '{}': {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),
}

impl ProjectError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> ProjectError + '_ {
        move |err| ProjectError::Io(path.to_path_buf(), err)
    }
}

/// The metadata written into a project, shared by both flows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub project_name: String,
    pub board_name: String,
    pub designer: String,
    pub company: String,
    pub revision: String,
    pub description: String,
}

fn require(value: &str, field: Field) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}

/// Like [`require`], for values that become file or directory names.
fn require_name(value: &str, field: Field) -> Result<(), ValidationError> {
    require(value, field)?;
    let value = value.trim();
    let mut components = Path::new(value).components();
    let single_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_name || value.contains(|c: char| c == '/' || c == '\\') {
        return Err(ValidationError::NotAName(field));
    }
    Ok(())
}

impl ProjectMetadata {
    /// The revision, or `1.0.0` when left blank.
    pub fn revision(&self) -> &str {
        match self.revision.trim() {
            "" => DEFAULT_REVISION,
            revision => revision,
        }
    }

    /// The company, or `null` when left blank.
    pub fn company_or_null(&self) -> &str {
        match self.company.trim() {
            "" => NULL_COMPANY,
            company => company,
        }
    }

    /// Checks the fields the update flow needs. The first missing field
    /// is reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.project_name, Field::ProjectName)?;
        require(&self.board_name, Field::BoardName)?;
        require(&self.designer, Field::Designer)
    }
}

/// Everything the new-project flow is given.
#[derive(Clone, Debug)]
pub struct ProjectInputs {
    pub location: PathBuf,
    pub metadata: ProjectMetadata,
    pub pcb_template: Option<PcbTemplate>,
    pub license: License,
}

impl ProjectInputs {
    /// `location/project_name`.
    pub fn project_path(&self) -> PathBuf {
        self.location.join(self.metadata.project_name.trim())
    }

    /// Checks the fields the new-project flow needs, in form order, and
    /// that the template offers at least one PCB variant.
    pub fn validate(&self, discovered: &[PcbTemplate]) -> Result<(), ValidationError> {
        if self.location.as_os_str().is_empty() {
            return Err(ValidationError::Missing(Field::Location));
        }
        require_name(&self.metadata.project_name, Field::ProjectName)?;
        require_name(&self.metadata.board_name, Field::BoardName)?;
        require(&self.metadata.designer, Field::Designer)?;
        if discovered.is_empty() {
            return Err(ValidationError::NoPcbTemplates);
        }
        Ok(())
    }
}

/// Picks the template a selector names, or the first one when there is
/// no selector.
pub fn select_pcb_template(
    discovered: &[PcbTemplate],
    selector: Option<&str>,
) -> Result<PcbTemplate, ValidationError> {
    match selector {
        Some(selector) => discovered
            .iter()
            .find(|t| t.is_named(selector))
            .cloned()
            .ok_or_else(|| ValidationError::UnknownPcbTemplate(selector.to_string())),
        None => discovered
            .first()
            .cloned()
            .ok_or(ValidationError::NoPcbTemplates),
    }
}

/// What happened to one step of a multi-step operation.
#[derive(Debug)]
pub enum StepStatus {
    Done,
    Skipped(String),
    Failed(String),
}

/// Per-step outcome of a best-effort file operation.
#[derive(Debug, Default)]
pub struct StepReport {
    pub steps: Vec<(&'static str, StepStatus)>,
}

impl StepReport {
    pub fn record(&mut self, step: &'static str, status: StepStatus) {
        match &status {
            StepStatus::Done => tracing::info!("{}: done", step),
            StepStatus::Skipped(reason) => tracing::warn!("{}: skipped ({})", step, reason),
            StepStatus::Failed(reason) => tracing::warn!("{}: failed ({})", step, reason),
        }
        self.steps.push((step, status));
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.steps.iter().filter_map(|(step, status)| match status {
            StepStatus::Failed(reason) => Some((*step, reason.as_str())),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.steps
            .iter()
            .all(|(_, status)| matches!(status, StepStatus::Done))
    }

    pub fn status_of(&self, step: &str) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|(name, _)| *name == step)
            .map(|(_, status)| status)
    }
}
