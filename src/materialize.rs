//! Creating a new project from the template tree.

use crate::{
    copy,
    license::{self, License, LicenseSource},
    metadata::{self, KIBOT_CONFIG, PROJECT_EXTENSION, SCHEMATIC_EXTENSION},
    project::{ProjectError, ProjectInputs, StepReport, StepStatus},
    template::{self, TemplateTree, ACTIVE_PCB_FILE, HARDWARE_DIR, PLACEHOLDER_STEM},
};
use chrono::{Datelike, NaiveDate};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

pub const STEP_RENAME_BOARD_DIR: &str = "rename board directory";
pub const STEP_APPLY_PCB: &str = "install PCB template";
pub const STEP_PCB_NAMES: &str = "set PCB names";
pub const STEP_RENAME_FILES: &str = "rename project files";
pub const STEP_SCHEMATIC_TITLE: &str = "set schematic title";
pub const STEP_PROJECT_FILE: &str = "update project file";
pub const STEP_KIBOT: &str = "update KiBot configuration";
pub const STEP_LICENSE: &str = "install license";

/// A project that was created, along with how each step went.
#[derive(Debug)]
pub struct CreatedProject {
    pub path: PathBuf,
    pub board_dir: PathBuf,
    pub report: StepReport,
}

impl CreatedProject {
    /// The `.kicad_pro` file to open in KiCad.
    pub fn project_file(&self) -> PathBuf {
        let board_name = self
            .board_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.board_dir
            .join(format!("{}.{}", board_name, PROJECT_EXTENSION))
    }
}

fn status_of_substitution(result: std::io::Result<usize>, anchor: &str) -> StepStatus {
    match result {
        Ok(0) => StepStatus::Skipped(format!("placeholder {} not found", anchor)),
        Ok(_) => StepStatus::Done,
        Err(err) => StepStatus::Failed(err.to_string()),
    }
}

/// Copies the template tree to `location/project_name` and specializes it.
///
/// The destination must not exist and the template tree must. Once the
/// tree is copied, the remaining steps are best effort: each is attempted
/// and its outcome recorded in the returned report.
pub fn create_project(
    template: &TemplateTree,
    inputs: &ProjectInputs,
    licenses: &dyn LicenseSource,
    today: NaiveDate,
) -> Result<CreatedProject, ProjectError> {
    if !template.exists() {
        return Err(ProjectError::TemplateMissing(template.root().to_path_buf()));
    }
    let project_path = inputs.project_path();
    if project_path.exists() {
        return Err(ProjectError::DestinationExists(project_path));
    }

    info!("Creating project at {}", project_path.display());
    copy::copy_tree(template.root(), &project_path).map_err(ProjectError::io(&project_path))?;

    let meta = &inputs.metadata;
    let board_name = meta.board_name.trim();
    let board_dir = project_path.join(board_name);
    let mut report = StepReport::default();

    report.record(
        STEP_RENAME_BOARD_DIR,
        rename_board_dir(&project_path.join(HARDWARE_DIR), &board_dir),
    );

    match &inputs.pcb_template {
        Some(pcb) => {
            report.record(STEP_APPLY_PCB, apply_pcb_template(&board_dir, &pcb.file_name));
            let active = board_dir.join(ACTIVE_PCB_FILE);
            let status = if active.is_file() {
                status_of_substitution(
                    metadata::rewrite_file(&active, |text| {
                        metadata::substitute_pcb_names(text, board_name, meta.project_name.trim())
                    }),
                    "BOARD_NAME/PROJECT_NAME \"Template\"",
                )
            } else {
                StepStatus::Skipped(format!("{} not present", ACTIVE_PCB_FILE))
            };
            report.record(STEP_PCB_NAMES, status);
        }
        None => {
            report.record(STEP_APPLY_PCB, StepStatus::Skipped("no PCB template selected".into()));
        }
    }

    report.record(STEP_RENAME_FILES, rename_placeholder_files(&board_dir, board_name));

    let schematic = board_dir.join(format!("{}.{}", board_name, SCHEMATIC_EXTENSION));
    let status = if schematic.is_file() {
        status_of_substitution(
            metadata::rewrite_file(&schematic, |text| {
                metadata::substitute_schematic_title(text, board_name)
            }),
            "(title \"Template\")",
        )
    } else {
        StepStatus::Skipped(format!("{} not present", schematic.display()))
    };
    report.record(STEP_SCHEMATIC_TITLE, status);

    let project_file = board_dir.join(format!("{}.{}", board_name, PROJECT_EXTENSION));
    report.record(
        STEP_PROJECT_FILE,
        match metadata::update_project_file(&project_file, meta, today) {
            Ok(()) => StepStatus::Done,
            Err(err) => StepStatus::Failed(err.to_string()),
        },
    );

    report.record(STEP_KIBOT, update_kibot_config(&board_dir, meta));

    let status = if inputs.license == License::None {
        StepStatus::Skipped("no license selected".into())
    } else {
        let installed = license::install(
            licenses,
            inputs.license,
            today.year(),
            meta.designer.trim(),
            &project_path,
            &board_dir,
        );
        if installed.failed.is_empty() {
            debug!("{} license files written", installed.written.len());
            StepStatus::Done
        } else {
            StepStatus::Failed(
                installed
                    .failed
                    .iter()
                    .map(|(path, err)| format!("{}: {}", path.display(), err))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
    };
    report.record(STEP_LICENSE, status);

    Ok(CreatedProject {
        path: project_path,
        board_dir,
        report,
    })
}

fn rename_board_dir(hardware_dir: &Path, board_dir: &Path) -> StepStatus {
    if hardware_dir == board_dir {
        return StepStatus::Done;
    }
    if !hardware_dir.is_dir() {
        return StepStatus::Skipped(format!("template has no {}/ directory", HARDWARE_DIR));
    }
    if board_dir.exists() {
        return StepStatus::Failed(format!("{} already exists", board_dir.display()));
    }
    match fs::rename(hardware_dir, board_dir) {
        Ok(()) => StepStatus::Done,
        Err(err) => StepStatus::Failed(err.to_string()),
    }
}

/// Installs the chosen variant as `Template.kicad_pcb` and deletes every
/// `Template - *.kicad_pcb` variant from the board directory.
fn apply_pcb_template(board_dir: &Path, file_name: &str) -> StepStatus {
    let source = board_dir.join(file_name);
    if !source.is_file() {
        return StepStatus::Skipped(format!("{} not present", source.display()));
    }
    if let Err(err) = fs::copy(&source, board_dir.join(ACTIVE_PCB_FILE)) {
        return StepStatus::Failed(err.to_string());
    }
    let errors: Vec<String> = template::pcb_template_files(board_dir)
        .into_iter()
        .filter_map(|variant| {
            fs::remove_file(&variant)
                .err()
                .map(|err| format!("{}: {}", variant.display(), err))
        })
        .collect();
    if errors.is_empty() {
        StepStatus::Done
    } else {
        StepStatus::Failed(errors.join("; "))
    }
}

/// Renames `Template.<ext>` to `<board_name>.<ext>`.
fn rename_placeholder_files(board_dir: &Path, board_name: &str) -> StepStatus {
    if !board_dir.is_dir() {
        return StepStatus::Skipped(format!("{} not present", board_dir.display()));
    }
    let mut errors = vec![];
    for file in template::placeholder_files(board_dir) {
        let name = match file.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        let renamed = board_dir.join(name.replacen(PLACEHOLDER_STEM, board_name, 1));
        if let Err(err) = fs::rename(&file, &renamed) {
            errors.push(format!("{}: {}", file.display(), err));
        }
    }
    if errors.is_empty() {
        StepStatus::Done
    } else {
        StepStatus::Failed(errors.join("; "))
    }
}

/// Rewrites the KiBot definitions, if the board has a KiBot configuration.
pub fn update_kibot_config(board_dir: &Path, meta: &crate::project::ProjectMetadata) -> StepStatus {
    let config = board_dir.join(KIBOT_CONFIG);
    if !config.is_file() {
        return StepStatus::Skipped(format!("{} not present", KIBOT_CONFIG));
    }
    status_of_substitution(
        metadata::rewrite_file(&config, |text| metadata::substitute_kibot_definitions(text, meta)),
        "PROJECT_NAME/BOARD_NAME/COMPANY/DESIGNER definitions",
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        license::FetchError,
        metadata::read_text_variables,
        project::{ProjectMetadata, StepStatus},
    };
    use std::cell::Cell;
    use tempfile::TempDir;

    pub(crate) struct Offline {
        pub calls: Cell<usize>,
    }

    impl Offline {
        pub fn new() -> Self {
            Offline {
                calls: Cell::new(0),
            }
        }
    }

    impl LicenseSource for Offline {
        fn fetch(&self, key: &str) -> Result<String, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Err(FetchError::Empty {
                url: format!("offline://{}", key),
            })
        }
    }

    const PCB_VARIANT: &str = "(kicad_pcb\n  (property \"BOARD_NAME\" \"Template\")\n  (property \"PROJECT_NAME\" \"Template\")\n)\n";

    /// Builds a miniature template tree shaped like the bundled one.
    pub(crate) fn template_tree(root: &Path) -> TemplateTree {
        let hardware = root.join(HARDWARE_DIR);
        fs::create_dir_all(hardware.join("kibot_yaml")).unwrap();
        fs::write(
            hardware.join("Template - JLCPCB_1.6mm_4-layer.kicad_pcb"),
            PCB_VARIANT,
        )
        .unwrap();
        fs::write(
            hardware.join("Template - PCBWay_1.0mm_2-layer.kicad_pcb"),
            "(kicad_pcb (layers 2))\n",
        )
        .unwrap();
        fs::write(
            hardware.join("Template.kicad_sch"),
            "(kicad_sch\n  (title_block\n    (title \"Template\")\n  )\n)\n",
        )
        .unwrap();
        fs::write(
            hardware.join("Template.kicad_pro"),
            "{\n  \"meta\": {\"filename\": \"Template.kicad_pro\"},\n  \"text_variables\": {\"LOGO\": \"logo.png\"}\n}\n",
        )
        .unwrap();
        fs::write(
            hardware.join("kibot_yaml/kibot_main.yaml"),
            "definitions:\n  PROJECT_NAME: Project\n  BOARD_NAME: Board\n  COMPANY: Someone\n  DESIGNER: Someone\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("firmware/src")).unwrap();
        fs::write(root.join("firmware/src/main.c"), "int main(void) {}\n").unwrap();
        fs::create_dir_all(root.join("cad")).unwrap();
        fs::create_dir_all(root.join(".github/workflows")).unwrap();
        fs::write(root.join(".github/workflows/ci.yaml"), "on: push\n").unwrap();
        fs::write(root.join("README.md"), "# \"$Project\"\nDesigned by \"$Designer\"\n").unwrap();
        fs::write(root.join(".gitignore"), "*-backups/\n").unwrap();
        TemplateTree::new(root)
    }

    fn inputs(location: &Path, tree: &TemplateTree, license: License) -> ProjectInputs {
        ProjectInputs {
            location: location.to_path_buf(),
            metadata: ProjectMetadata {
                project_name: "Widget".into(),
                board_name: "MainBoard".into(),
                designer: "Jane".into(),
                revision: String::new(),
                ..Default::default()
            },
            pcb_template: tree.scan_pcb_templates().into_iter().next(),
            license,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn creates_a_specialized_project() {
        let dir = TempDir::new().unwrap();
        let tree = template_tree(&dir.path().join("template"));
        let location = dir.path().join("projects");
        fs::create_dir(&location).unwrap();

        let licenses = Offline::new();
        let inputs = inputs(&location, &tree, License::None);
        let created = create_project(&tree, &inputs, &licenses, today()).unwrap();

        assert_eq!(created.report.failures().count(), 0);
        assert_eq!(created.path, location.join("Widget"));
        let board = created.path.join("MainBoard");
        assert_eq!(created.board_dir, board);
        assert!(!created.path.join(HARDWARE_DIR).exists());

        let variables = read_text_variables(&created.project_file()).unwrap();
        assert_eq!(variables["PROJECT_NAME"], "Widget");
        assert_eq!(variables["BOARD_NAME"], "MainBoard");
        assert_eq!(variables["DESIGNER"], "Jane");
        assert_eq!(variables["REVISION"], "1.0.0");
        assert_eq!(variables["COMPANY"], "null");
        assert_eq!(variables["LOGO"], "logo.png");

        let schematic = fs::read_to_string(board.join("MainBoard.kicad_sch")).unwrap();
        assert!(schematic.contains("(title \"MainBoard\")"));

        let pcb = fs::read_to_string(board.join("MainBoard.kicad_pcb")).unwrap();
        assert!(pcb.contains("(property \"BOARD_NAME\" \"MainBoard\")"));
        assert!(pcb.contains("(property \"PROJECT_NAME\" \"Widget\")"));
        assert!(template::pcb_template_files(&board).is_empty());
        assert!(template::placeholder_files(&board).is_empty());

        let kibot = fs::read_to_string(board.join(KIBOT_CONFIG)).unwrap();
        assert!(kibot.contains("  PROJECT_NAME: Widget\n"));
        assert!(kibot.contains("  COMPANY: null\n"));

        assert_eq!(licenses.calls.get(), 0);
        assert!(!created.path.join("LICENSE").exists());
        assert!(matches!(
            created.report.status_of(STEP_LICENSE),
            Some(StepStatus::Skipped(_))
        ));
        assert!(created.path.join("firmware/src/main.c").is_file());
    }

    #[test]
    fn selected_license_is_written_even_offline() {
        let dir = TempDir::new().unwrap();
        let tree = template_tree(&dir.path().join("template"));
        let licenses = Offline::new();
        let inputs = inputs(dir.path(), &tree, License::Mit);

        let created = create_project(&tree, &inputs, &licenses, today()).unwrap();

        assert_eq!(licenses.calls.get(), 1);
        for sub in ["", "MainBoard", "firmware", "cad"] {
            let text = fs::read_to_string(created.path.join(sub).join("LICENSE")).unwrap();
            assert!(text.contains("Copyright (c) 2024 Jane"), "{}", sub);
        }
        assert!(!created.path.join(".github/LICENSE").exists());
    }

    #[test]
    fn existing_destination_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let tree = template_tree(&dir.path().join("template"));
        let existing = dir.path().join("Widget");
        fs::create_dir(&existing).unwrap();
        fs::write(existing.join("notes.txt"), "mine").unwrap();

        let result = create_project(&tree, &inputs(dir.path(), &tree, License::Mit), &Offline::new(), today());

        assert!(matches!(result, Err(ProjectError::DestinationExists(_))));
        let entries: Vec<_> = fs::read_dir(&existing).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(fs::read_to_string(existing.join("notes.txt")).unwrap(), "mine");
    }

    #[test]
    fn missing_template_is_reported_first() {
        let dir = TempDir::new().unwrap();
        let tree = TemplateTree::new(dir.path().join("no-template"));
        let inputs = ProjectInputs {
            location: dir.path().to_path_buf(),
            metadata: ProjectMetadata::default(),
            pcb_template: None,
            license: License::None,
        };
        let result = create_project(&tree, &inputs, &Offline::new(), today());
        assert!(matches!(result, Err(ProjectError::TemplateMissing(_))));
    }

    #[test]
    fn template_without_anchors_reports_skips() {
        let dir = TempDir::new().unwrap();
        let tree = template_tree(&dir.path().join("template"));
        let mut inputs = inputs(&dir.path().join("out"), &tree, License::None);
        fs::create_dir(&inputs.location).unwrap();
        inputs.pcb_template = tree
            .scan_pcb_templates()
            .into_iter()
            .find(|t| t.manufacturer == "PCBWay");

        let created = create_project(&tree, &inputs, &Offline::new(), today()).unwrap();

        assert!(matches!(
            created.report.status_of(STEP_PCB_NAMES),
            Some(StepStatus::Skipped(_))
        ));
        assert!(matches!(
            created.report.status_of(STEP_PROJECT_FILE),
            Some(StepStatus::Done)
        ));
        assert!(!created.report.is_clean());
    }
}
