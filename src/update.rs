//! Refreshing the metadata of a project that already exists.

use crate::{
    backfill::{self, BackfillReport},
    board::BoardHost,
    materialize,
    metadata::{self, PROJECT_EXTENSION},
    project::{ProjectError, ProjectMetadata, StepStatus},
    template::TemplateTree,
};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the pieces of an open board's project live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLocation {
    pub board_file: PathBuf,
    pub board_dir: PathBuf,
    /// One level above the board directory.
    pub project_root: PathBuf,
    /// `<board dir>/<board stem>.kicad_pro`
    pub project_file: PathBuf,
}

impl ProjectLocation {
    pub fn of_board_file(board_file: &Path) -> Self {
        let board_dir = board_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let project_root = board_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| board_dir.clone());
        let stem = board_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        ProjectLocation {
            board_file: board_file.to_path_buf(),
            project_file: board_dir.join(format!("{}.{}", stem, PROJECT_EXTENSION)),
            board_dir,
            project_root,
        }
    }

    /// The board file's stem, which pre-fills the board name.
    pub fn board_stem(&self) -> String {
        self.board_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Locates the project of the open board. The board must have been saved.
pub fn locate(board: &dyn BoardHost) -> Result<ProjectLocation, ProjectError> {
    match board.file_name() {
        Some(path) if !path.as_os_str().is_empty() => Ok(ProjectLocation::of_board_file(path)),
        _ => Err(ProjectError::BoardUnsaved),
    }
}

/// Sets title, description (comment slot 0, when given), company,
/// revision and date on the board and marks it modified.
pub fn update_board_metadata(board: &mut dyn BoardHost, meta: &ProjectMetadata, today: NaiveDate) {
    let mut block = board.title_block();
    block.title = meta.board_name.trim().to_string();
    if !meta.description.trim().is_empty() {
        block.set_comment(0, meta.description.trim());
    }
    block.company = meta.company.trim().to_string();
    block.revision = meta.revision().to_string();
    block.date = metadata::iso_date(today);
    board.set_title_block(block);
    board.set_modified();
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub location: ProjectLocation,
    pub kibot: StepStatus,
    /// Whether the board could be saved with its new title block.
    pub board: StepStatus,
    /// Present when backfilling was requested.
    pub backfill: Option<BackfillReport>,
}

/// Rewrites the project file's text variables and the board's title
/// block, refreshes the KiBot definitions when present, and, given a
/// template, copies over the template pieces the project lacks.
///
/// Fails without touching anything if the board is unsaved or the
/// project file is missing or unreadable. Once the project file is
/// written, the remaining steps are reported in the outcome.
pub fn update_project(
    board: &mut dyn BoardHost,
    meta: &ProjectMetadata,
    today: NaiveDate,
    backfill_from: Option<&TemplateTree>,
) -> Result<UpdateOutcome, ProjectError> {
    let location = locate(board)?;
    info!("Updating project file {}", location.project_file.display());
    metadata::update_project_file(&location.project_file, meta, today)?;

    update_board_metadata(board, meta, today);
    let kibot = materialize::update_kibot_config(&location.board_dir, meta);

    let backfill = backfill_from
        .map(|template| backfill::copy_missing_template_files(template, &location.project_root, meta));

    let board = match board.refresh() {
        Ok(()) => StepStatus::Done,
        Err(err) => {
            warn!("Could not save the board: {}", err);
            StepStatus::Failed(err.to_string())
        }
    };
    Ok(UpdateOutcome {
        location,
        kibot,
        board,
        backfill,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{BoardError, TitleBlock},
        materialize::tests::template_tree,
        metadata::read_text_variables,
    };
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeBoard {
        path: Option<PathBuf>,
        block: TitleBlock,
        modified: bool,
        refreshed: usize,
        read_only: bool,
    }

    impl BoardHost for FakeBoard {
        fn file_name(&self) -> Option<&Path> {
            self.path.as_deref()
        }

        fn title_block(&self) -> TitleBlock {
            self.block.clone()
        }

        fn set_title_block(&mut self, block: TitleBlock) {
            self.block = block;
        }

        fn set_modified(&mut self) {
            self.modified = true;
        }

        fn refresh(&mut self) -> Result<(), BoardError> {
            self.refreshed += 1;
            match (&self.path, self.read_only) {
                (Some(path), true) => Err(BoardError::Write(
                    path.clone(),
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                )),
                _ => Ok(()),
            }
        }
    }

    fn meta() -> ProjectMetadata {
        ProjectMetadata {
            project_name: "Widget".into(),
            board_name: "MainBoard".into(),
            designer: "Jane".into(),
            company: "ACME".into(),
            revision: "2.0".into(),
            description: "Motor driver".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn project(dir: &TempDir) -> PathBuf {
        let board_dir = dir.path().join("Widget/MainBoard");
        fs::create_dir_all(&board_dir).unwrap();
        fs::write(board_dir.join("MainBoard.kicad_pcb"), "(kicad_pcb)").unwrap();
        fs::write(
            board_dir.join("MainBoard.kicad_pro"),
            r#"{"text_variables": {"KEEP": "me"}}"#,
        )
        .unwrap();
        board_dir.join("MainBoard.kicad_pcb")
    }

    #[test]
    fn locates_project_pieces() {
        let location = ProjectLocation::of_board_file(Path::new("/p/Widget/Main/Main.kicad_pcb"));
        assert_eq!(location.board_dir, Path::new("/p/Widget/Main"));
        assert_eq!(location.project_root, Path::new("/p/Widget"));
        assert_eq!(location.project_file, Path::new("/p/Widget/Main/Main.kicad_pro"));
        assert_eq!(location.board_stem(), "Main");
    }

    #[test]
    fn unsaved_board_is_refused() {
        let mut board = FakeBoard::default();
        let result = update_project(&mut board, &meta(), today(), None);
        assert!(matches!(result, Err(ProjectError::BoardUnsaved)));
        assert!(!board.modified);
        assert_eq!(board.refreshed, 0);
    }

    #[test]
    fn missing_project_file_aborts_before_the_board() {
        let dir = TempDir::new().unwrap();
        let board_file = project(&dir);
        fs::remove_file(board_file.with_extension("kicad_pro")).unwrap();
        let mut board = FakeBoard {
            path: Some(board_file),
            ..Default::default()
        };

        let result = update_project(&mut board, &meta(), today(), None);
        assert!(matches!(result, Err(ProjectError::ProjectFileMissing(_))));
        assert!(!board.modified);
    }

    #[test]
    fn updates_project_file_and_title_block() {
        let dir = TempDir::new().unwrap();
        let mut board = FakeBoard {
            path: Some(project(&dir)),
            ..Default::default()
        };
        board.block.set_comment(1, "kept");

        let outcome = update_project(&mut board, &meta(), today(), None).unwrap();

        let variables = read_text_variables(&outcome.location.project_file).unwrap();
        assert_eq!(variables["KEEP"], "me");
        assert_eq!(variables["COMPANY"], "ACME");
        assert_eq!(variables["REVISION"], "2.0");

        assert!(board.modified);
        assert_eq!(board.refreshed, 1);
        assert_eq!(board.block.title, "MainBoard");
        assert_eq!(board.block.company, "ACME");
        assert_eq!(board.block.revision, "2.0");
        assert_eq!(board.block.date, "2024-03-14");
        assert_eq!(board.block.comment(0), Some("Motor driver"));
        assert_eq!(board.block.comment(1), Some("kept"));
        assert!(matches!(outcome.kibot, StepStatus::Skipped(_)));
        assert!(matches!(outcome.board, StepStatus::Done));
        assert!(outcome.backfill.is_none());
    }

    #[test]
    fn refreshes_kibot_definitions_when_present() {
        let dir = TempDir::new().unwrap();
        let board_file = project(&dir);
        let kibot = dir.path().join("Widget/MainBoard/kibot_yaml/kibot_main.yaml");
        fs::create_dir_all(kibot.parent().unwrap()).unwrap();
        fs::write(
            &kibot,
            "kibot:\n  version: 1\n\ndefinitions:\n  PROJECT_NAME: Old\n  BOARD_NAME: Old\n  COMPANY: Old Co\n  DESIGNER: Someone\n  KEEP: this\n",
        )
        .unwrap();
        let mut board = FakeBoard {
            path: Some(board_file),
            ..Default::default()
        };
        let meta = ProjectMetadata {
            company: "  ".into(),
            ..meta()
        };

        let outcome = update_project(&mut board, &meta, today(), None).unwrap();

        assert!(matches!(outcome.kibot, StepStatus::Done));
        assert_eq!(
            fs::read_to_string(&kibot).unwrap(),
            "kibot:\n  version: 1\n\ndefinitions:\n  PROJECT_NAME: Widget\n  BOARD_NAME: MainBoard\n  COMPANY: null\n  DESIGNER: Jane\n  KEEP: this\n"
        );
    }

    #[test]
    fn failed_board_save_keeps_the_rest_of_the_outcome() {
        let dir = TempDir::new().unwrap();
        let tree = template_tree(&dir.path().join("template"));
        let mut board = FakeBoard {
            path: Some(project(&dir)),
            read_only: true,
            ..Default::default()
        };

        let outcome = update_project(&mut board, &meta(), today(), Some(&tree)).unwrap();

        assert!(matches!(outcome.board, StepStatus::Failed(ref reason) if reason.contains("read-only")));
        let variables = read_text_variables(&outcome.location.project_file).unwrap();
        assert_eq!(variables["PROJECT_NAME"], "Widget");
        let report = outcome.backfill.unwrap();
        assert!(report.copied.contains(&"firmware/ (complete folder)".to_string()));
    }

    #[test]
    fn backfill_never_touches_existing_directories() {
        let dir = TempDir::new().unwrap();
        let tree = template_tree(&dir.path().join("template"));
        let board_file = project(&dir);
        let cad = dir.path().join("Widget/cad");
        fs::create_dir_all(&cad).unwrap();
        fs::write(cad.join("enclosure.step"), "mine").unwrap();
        let mut board = FakeBoard {
            path: Some(board_file),
            ..Default::default()
        };

        let outcome = update_project(&mut board, &meta(), today(), Some(&tree)).unwrap();

        let report = outcome.backfill.unwrap();
        assert!(report.copied.contains(&"firmware/ (complete folder)".to_string()));
        assert!(!report.copied.iter().any(|c| c.starts_with("cad/")));
        let cad_entries: Vec<_> = fs::read_dir(&cad).unwrap().collect();
        assert_eq!(cad_entries.len(), 1);
        assert_eq!(fs::read_to_string(cad.join("enclosure.step")).unwrap(), "mine");
    }
}
