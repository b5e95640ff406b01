//! Textual edits applied to the KiCad files of a project: the project
//! file's text variables, fixed placeholders in the PCB and schematic,
//! the KiBot definitions and the README.

use crate::project::{ProjectError, ProjectMetadata};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::{fs, io, path::Path};
use tracing::debug;

pub const PROJECT_EXTENSION: &str = "kicad_pro";
pub const SCHEMATIC_EXTENSION: &str = "kicad_sch";
pub const PCB_EXTENSION: &str = "kicad_pcb";
/// KiBot configuration, relative to the board directory.
pub const KIBOT_CONFIG: &str = "kibot_yaml/kibot_main.yaml";

/// `14-Mar-2024`
pub fn human_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// `2024-03-14`
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Quotes a value for use inside a KiCad s-expression string.
pub fn sexpr_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The seven text variables this tool owns, in the order they are written.
pub fn text_variables(meta: &ProjectMetadata, today: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("PROJECT_NAME", meta.project_name.trim().to_string()),
        ("BOARD_NAME", meta.board_name.trim().to_string()),
        ("DESIGNER", meta.designer.trim().to_string()),
        ("COMPANY", meta.company_or_null().to_string()),
        ("RELEASE_DATE", human_date(today)),
        ("RELEASE_DATE_NUM", iso_date(today)),
        ("REVISION", meta.revision().to_string()),
    ]
}

fn invalid(message: &str) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(message)
}

/// Read-modify-write of a `.kicad_pro` file. Only the seven owned keys of
/// `text_variables` change; everything else, including key order, is kept.
pub fn update_project_file(
    path: &Path,
    meta: &ProjectMetadata,
    today: NaiveDate,
) -> Result<(), ProjectError> {
    if !path.is_file() {
        return Err(ProjectError::ProjectFileMissing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(ProjectError::io(path))?;
    let mut project: Map<String, Value> = serde_json::from_str(&content)
        .map_err(|e| ProjectError::ProjectFileInvalid(path.to_path_buf(), e))?;

    let variables = project
        .entry("text_variables")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| {
            ProjectError::ProjectFileInvalid(
                path.to_path_buf(),
                invalid("`text_variables` is not an object"),
            )
        })?;
    for (key, value) in text_variables(meta, today) {
        variables.insert(key.to_string(), Value::String(value));
    }

    let mut serialized = serde_json::to_string_pretty(&project)
        .map_err(|e| ProjectError::ProjectFileInvalid(path.to_path_buf(), e))?;
    serialized.push('\n');
    fs::write(path, serialized).map_err(ProjectError::io(path))?;
    debug!("Updated text variables in {}", path.display());
    Ok(())
}

/// Reads the text variables of a `.kicad_pro` file, if any.
pub fn read_text_variables(path: &Path) -> Result<Map<String, Value>, ProjectError> {
    let content = fs::read_to_string(path).map_err(ProjectError::io(path))?;
    let project: Value = serde_json::from_str(&content)
        .map_err(|e| ProjectError::ProjectFileInvalid(path.to_path_buf(), e))?;
    Ok(project
        .get("text_variables")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default())
}

/// Result of a placeholder substitution: the new text and how many
/// anchors were replaced.
pub struct Substituted {
    pub text: String,
    pub replaced: usize,
}

fn replace_counting(text: &str, from: &str, to: &str) -> Substituted {
    Substituted {
        replaced: text.matches(from).count(),
        text: text.replace(from, to),
    }
}

/// Sets the board and project name properties a PCB variant carries as
/// `"BOARD_NAME" "Template"` and `"PROJECT_NAME" "Template"`.
pub fn substitute_pcb_names(text: &str, board_name: &str, project_name: &str) -> Substituted {
    let board = replace_counting(
        text,
        "BOARD_NAME\" \"Template\"",
        &format!("BOARD_NAME\" \"{}\"", sexpr_escape(board_name)),
    );
    let project = replace_counting(
        &board.text,
        "PROJECT_NAME\" \"Template\"",
        &format!("PROJECT_NAME\" \"{}\"", sexpr_escape(project_name)),
    );
    Substituted {
        text: project.text,
        replaced: board.replaced + project.replaced,
    }
}

/// Replaces `(title "Template")` in a schematic.
pub fn substitute_schematic_title(text: &str, board_name: &str) -> Substituted {
    replace_counting(
        text,
        "(title \"Template\")",
        &format!("(title \"{}\")", sexpr_escape(board_name)),
    )
}

/// Rewrites the value of the `PROJECT_NAME`, `BOARD_NAME`, `COMPANY` and
/// `DESIGNER` definitions, whatever they currently hold.
pub fn substitute_kibot_definitions(text: &str, meta: &ProjectMetadata) -> Substituted {
    let definitions = [
        ("PROJECT_NAME", meta.project_name.trim()),
        ("BOARD_NAME", meta.board_name.trim()),
        ("COMPANY", meta.company_or_null()),
        ("DESIGNER", meta.designer.trim()),
    ];
    let mut text = text.to_string();
    let mut replaced = 0;
    for (label, value) in definitions {
        let line = Regex::new(&format!(r"(?m)^([ \t]*{}:[ \t]*)[^\r\n]*", label))
            .expect("definition pattern is valid");
        replaced += line.find_iter(&text).count();
        text = line
            .replace_all(&text, |caps: &Captures| format!("{}{}", &caps[1], value))
            .into_owned();
    }
    Substituted { text, replaced }
}

/// Fills the `"$Project"`, `"$Designer"` and `"$User"` tokens of the
/// template README.
pub fn substitute_readme(text: &str, meta: &ProjectMetadata) -> Substituted {
    let project = replace_counting(text, "\"$Project\"", meta.project_name.trim());
    let designer = replace_counting(&project.text, "\"$Designer\"", meta.designer.trim());
    let user = replace_counting(&designer.text, "\"$User\"", meta.designer.trim());
    Substituted {
        text: user.text,
        replaced: project.replaced + designer.replaced + user.replaced,
    }
}

/// Applies `edit` to the file at `path` and writes it back when anything
/// changed. Returns the number of replacements.
pub fn rewrite_file(path: &Path, edit: impl FnOnce(&str) -> Substituted) -> io::Result<usize> {
    let content = fs::read_to_string(path)?;
    let Substituted { text, replaced } = edit(&content);
    if replaced > 0 {
        fs::write(path, text)?;
    }
    Ok(replaced)
}
