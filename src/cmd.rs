use clap::ArgMatches;
use colored::Colorize;
use read_input::prelude::*;
use std::{fmt::Display, str::FromStr};

use crate::{project::ProjectMetadata, userbool::UserBool};

pub mod list;
pub mod new;
pub mod update;

pub const TEMPLATE_ARG: &str = "template";
pub const PROJECT_ARG: &str = "project";
pub const BOARD_ARG: &str = "board";
pub const DESIGNER_ARG: &str = "designer";
pub const COMPANY_ARG: &str = "company";
pub const REVISION_ARG: &str = "revision";
pub const DESCRIPTION_ARG: &str = "description";
pub const YES_ARG: &str = "yes";

/// What the tool was asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    New,
    Update,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::New, Mode::Update];

    pub fn describe(self) -> &'static str {
        match self {
            Mode::New => "Create a new project from the template",
            Mode::Update => "Update the metadata of an existing board",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Mode::New => new::CMD_STR,
            Mode::Update => update::CMD_STR,
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| s.trim().eq_ignore_ascii_case(&mode.to_string()))
            .ok_or_else(|| format!("Unknown mode '{}'", s))
    }
}

/// Metadata fields given on the command line. Whatever is missing is
/// asked for, unless `--yes` was given.
#[derive(Clone, Debug, Default)]
pub struct FieldArgs {
    pub project: Option<String>,
    pub board: Option<String>,
    pub designer: Option<String>,
    pub company: Option<String>,
    pub revision: Option<String>,
    pub description: Option<String>,
    pub assume_yes: bool,
}

impl FieldArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let value = |name: &str| matches.value_of(name).map(str::to_string);
        FieldArgs {
            project: value(PROJECT_ARG),
            board: value(BOARD_ARG),
            designer: value(DESIGNER_ARG),
            company: value(COMPANY_ARG),
            revision: value(REVISION_ARG),
            description: value(DESCRIPTION_ARG),
            assume_yes: matches.is_present(YES_ARG),
        }
    }

    /// Fills in the metadata, prompting for each field not given.
    /// `defaults` pre-fills the prompts (and stands in for them under
    /// `--yes`).
    pub fn resolve(self, defaults: &ProjectMetadata) -> ProjectMetadata {
        let ask = |given: Option<String>, label: &str, default: &str, required: bool| {
            match given {
                Some(value) => value.trim().to_string(),
                None if self.assume_yes => default.to_string(),
                None => prompt_text(label, Some(default), required),
            }
        };
        ProjectMetadata {
            project_name: ask(self.project, "Project name", &defaults.project_name, true),
            board_name: ask(self.board, "Board name", &defaults.board_name, true),
            designer: ask(self.designer, "Designer", &defaults.designer, true),
            company: ask(self.company, "Company", &defaults.company, false),
            revision: ask(self.revision, "Revision", defaults.revision(), false),
            description: ask(
                self.description,
                "Description",
                &defaults.description,
                false,
            ),
        }
    }
}

/// Prompts for a line of text. A non-empty `default` is shown and used
/// on an empty answer; required fields are asked again until answered.
pub fn prompt_text(label: &str, default: Option<&str>, required: bool) -> String {
    let required_err = format!("{} is required.", label).red();
    let answer = match default.filter(|d| !d.is_empty()) {
        Some(default) => input::<String>()
            .repeat_msg(format!(
                "{} {}: ",
                label,
                format!("[default: {}]", default).dimmed()
            ))
            .default(default.to_string())
            .add_err_test(move |s: &String| !required || !s.trim().is_empty(), required_err)
            .get(),
        None if required => input::<String>()
            .repeat_msg(format!("{}: ", label))
            .add_err_test(|s: &String| !s.trim().is_empty(), required_err)
            .get(),
        None => input::<String>()
            .msg(format!("{} {}: ", label, "(leave empty for none)".dimmed()))
            .get(),
    };
    answer.trim().to_string()
}

/// Asks a yes/no question. `--yes` answers every question with yes.
pub fn confirm(question: &str, default: bool, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    input::<UserBool>()
        .repeat_msg(format!("{} {} ", question, hint.dimmed()))
        .default(default.into())
        .err("Please answer yes or no.".red())
        .get()
        .into()
}

/// Prints `message` and exits with `code`.
pub fn fail(message: impl Display, code: exitcode::ExitCode) -> ! {
    println!("{}", message.to_string().red());
    std::process::exit(code)
}
