use chrono::Local;
use colored::Colorize;
use serde_json::{Map, Value};

use crate::{
    board::{BoardError, BoardHost, PcbBoard},
    cmd::{self, FieldArgs},
    config::LoadedConfig,
    metadata,
    project::{ProjectError, ProjectMetadata, StepStatus, NULL_COMPANY},
    template::TemplateTree,
    update::{self, ProjectLocation},
    userpath,
};

pub const CMD_STR: &str = "update";
pub const BOARD_FILE_ARG: &str = "BOARD";

const NOTICE: &str = "What will be updated:
  ✓ Project metadata (PROJECT_NAME, DESIGNER, COMPANY, etc.)
  ✓ Board title block information
  ✓ KiBot configuration (if present)

What will NOT be changed:
  ✗ Schematic (.kicad_sch)
  ✗ PCB layout (.kicad_pcb) beyond its title block
  ✗ Existing project structure

Some CI workflows may not work if the project lacks parts of the
template (firmware/, .github/workflows/, kibot_yaml/). You will be
offered to copy missing template files after the metadata update.";

const BACKFILL_QUESTION: &str = "Do you also want to copy missing template files?
This will add firmware/, 3d-print/, cad/, .github/, README.md and
.gitignore where they are missing. Existing files are not overwritten.
Copy?";

fn text_variable(variables: &Map<String, Value>, key: &str) -> Option<String> {
    variables
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Prompt defaults: the project file's and title block's current values
/// where there are any, then the remembered ones. The board name always
/// starts out as the board file's name.
fn prompt_defaults(
    config: &LoadedConfig,
    board: &dyn BoardHost,
    location: &ProjectLocation,
) -> ProjectMetadata {
    let variables = metadata::read_text_variables(&location.project_file).unwrap_or_default();
    let remembered = &config.config.defaults;
    ProjectMetadata {
        project_name: text_variable(&variables, "PROJECT_NAME").unwrap_or_default(),
        board_name: location.board_stem(),
        designer: text_variable(&variables, "DESIGNER")
            .or_else(|| remembered.designer.clone())
            .unwrap_or_default(),
        company: text_variable(&variables, "COMPANY")
            .filter(|company| company != NULL_COMPANY)
            .or_else(|| remembered.company.clone())
            .unwrap_or_default(),
        revision: text_variable(&variables, "REVISION").unwrap_or_default(),
        description: board
            .title_block()
            .comment(0)
            .unwrap_or_default()
            .to_string(),
    }
}

fn open_board(path: &str) -> PcbBoard {
    let path = match userpath::resolve(path) {
        Ok(path) => path,
        Err(err) => cmd::fail(err, exitcode::USAGE),
    };
    match PcbBoard::open(&path) {
        Ok(board) => board,
        Err(err @ BoardError::NotABoard(_)) => cmd::fail(err, exitcode::USAGE),
        Err(err @ BoardError::Malformed(_)) => cmd::fail(err, exitcode::DATAERR),
        Err(err) => cmd::fail(err, exitcode::IOERR),
    }
}

pub fn update(config: &LoadedConfig, template: &TemplateTree, board_file: &str, fields: FieldArgs) {
    let mut board = open_board(board_file);
    let location = match update::locate(&board) {
        Ok(location) => location,
        Err(err) => cmd::fail(err, exitcode::USAGE),
    };

    println!("{}", "Update existing project".bold());
    println!("{}", NOTICE);
    println!();
    let assume_yes = fields.assume_yes;
    if !cmd::confirm("Continue?", false, assume_yes) {
        println!("Aborted.");
        return;
    }

    let defaults = prompt_defaults(config, &board, &location);
    let meta = fields.resolve(&defaults);
    if let Err(err) = meta.validate() {
        cmd::fail(format!("Validation error: {}", err), exitcode::DATAERR);
    }

    let backfill_from = if cmd::confirm(BACKFILL_QUESTION, false, assume_yes) {
        if template.exists() {
            Some(template)
        } else {
            println!(
                "{} {}",
                "Template directory not found, nothing will be copied:".yellow(),
                template.root().to_string_lossy()
            );
            None
        }
    } else {
        None
    };

    let today = Local::now().date_naive();
    let outcome = match update::update_project(&mut board, &meta, today, backfill_from) {
        Ok(outcome) => outcome,
        Err(err @ ProjectError::ProjectFileMissing(_))
        | Err(err @ ProjectError::ProjectFileInvalid(..)) => {
            cmd::fail(format!("Failed to update project file: {}", err), exitcode::DATAERR)
        }
        Err(err) => cmd::fail(err, exitcode::IOERR),
    };

    println!("{}", "Project metadata updated successfully!".green());
    println!();
    println!("Project: {}", meta.project_name);
    println!("Board: {}", meta.board_name);
    println!("Designer: {}", meta.designer);
    println!(
        "Company: {}",
        if meta.company.is_empty() { "N/A" } else { meta.company.as_str() }
    );
    println!("Revision: {}", meta.revision());
    println!(
        "Project file: {}",
        outcome.location.project_file.to_string_lossy().dimmed()
    );
    match &outcome.kibot {
        StepStatus::Done => println!("KiBot configuration updated."),
        StepStatus::Skipped(reason) => println!("{} ({})", "KiBot configuration skipped".dimmed(), reason),
        StepStatus::Failed(reason) => println!("{} {}", "KiBot configuration failed:".red(), reason),
    }
    if let StepStatus::Failed(reason) = &outcome.board {
        println!("{} {}", "Could not save the board:".red(), reason);
    }
    if let Some(backfill) = &outcome.backfill {
        println!();
        println!("Copied template files:");
        for line in backfill.summary() {
            println!("- {}", line);
        }
    }
}
