use clap::{App, Arg, ArgMatches, SubCommand};
use colored::Colorize;
use std::{path::PathBuf, str::FromStr};

mod backfill;
mod board;
mod cmd;
mod config;
mod copy;
mod license;
mod materialize;
mod metadata;
mod project;
mod template;
mod ui;
mod update;
mod userbool;
mod userpath;
mod verbosity;
mod walkdir;

use cmd::{FieldArgs, Mode};
use config::LoadedConfig;
use license::License;
use template::TemplateTree;
use verbosity::Verbosity;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const CONFIG_DIR_ARG: &str = "config_dir";

/// Gets the default directory for the configuration file, namely
/// `(default config directory)/kicad-init`, where the default
/// configuration directory is given by the `dirs` crate.
fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kicad-init"))
}

fn field_args() -> Vec<Arg<'static, 'static>> {
    let field = |name: &'static str, help: &'static str| {
        Arg::with_name(name).long(name).takes_value(true).help(help)
    };
    vec![
        field(cmd::PROJECT_ARG, "Project name"),
        field(cmd::BOARD_ARG, "Board name"),
        field(cmd::DESIGNER_ARG, "Designer, also the license's copyright holder"),
        field(cmd::COMPANY_ARG, "Company (optional)"),
        field(cmd::REVISION_ARG, "Revision [default: 1.0.0]"),
        field(cmd::DESCRIPTION_ARG, "Free text description (optional)"),
        Arg::with_name(cmd::YES_ARG)
            .long("yes")
            .short("y")
            .help("Answer every question with its default, and confirmations with yes"),
    ]
}

fn app() -> App<'static, 'static> {
    App::new("kicad-init")
        .version(VERSION)
        .author("Miguel Murça <zvthryzhepn+rot13@gmail.com>")
        .about("Create KiCad projects from a template, or refresh an existing project's metadata.")
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity")
                .global(true),
        )
        .arg(
            Arg::with_name(CONFIG_DIR_ARG)
                .long("config-dir")
                .hidden(true)
                .takes_value(true)
                .env("KICAD_INIT_CONFIG")
                .global(true),
        )
        .arg(
            Arg::with_name(cmd::TEMPLATE_ARG)
                .long("template")
                .takes_value(true)
                .value_name("DIR")
                .env("KICAD_INIT_TEMPLATE")
                .help("The project template tree to use")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name(cmd::new::CMD_STR)
                .about("Creates a new project from the template.")
                .arg(
                    Arg::with_name(cmd::new::LOCATION_ARG)
                        .help("Where to create the new project")
                        .long_help(
                            "Where to create the new project. This is the *parent* \
                            directory: a folder named after the project is created in it.",
                        ),
                )
                .args(&field_args())
                .arg(
                    Arg::with_name(cmd::new::PCB_TEMPLATE_ARG)
                        .long(cmd::new::PCB_TEMPLATE_ARG)
                        .takes_value(true)
                        .help("PCB template, by file name or as <manufacturer>_<thickness>_<layers>"),
                )
                .arg(
                    Arg::with_name(cmd::new::LICENSE_ARG)
                        .long(cmd::new::LICENSE_ARG)
                        .takes_value(true)
                        .help("License key or name (see `list`), or `none`")
                        .validator(|value| License::from_str(&value).map(|_| ())),
                ),
        )
        .subcommand(
            SubCommand::with_name(cmd::update::CMD_STR)
                .about("Updates the metadata of an existing, saved board.")
                .arg(
                    Arg::with_name(cmd::update::BOARD_FILE_ARG)
                        .help("The .kicad_pcb file of the board")
                        .required(true),
                )
                .args(&field_args()),
        )
        .subcommand(
            SubCommand::with_name(cmd::list::CMD_STR)
                .about("Lists the PCB templates and licenses available."),
        )
}

fn load_config(matches: &ArgMatches) -> LoadedConfig {
    let config_dir = match matches.value_of(CONFIG_DIR_ARG) {
        Some(user_path) => match userpath::expand(user_path) {
            Ok(path) => path,
            Err(err) => cmd::fail(err, exitcode::CONFIG),
        },
        None => match default_config_dir() {
            Some(path) => path,
            None => cmd::fail(
                "This platform has no configuration directory; use --config-dir.",
                exitcode::CONFIG,
            ),
        },
    };
    match LoadedConfig::load_config(config_dir) {
        Ok(config) => config,
        Err(err) => cmd::fail(err, exitcode::CONFIG),
    }
}

fn template_tree(config: &LoadedConfig, matches: &ArgMatches) -> TemplateTree {
    let explicit = match matches.value_of(cmd::TEMPLATE_ARG).map(userpath::expand) {
        Some(Ok(path)) => Some(path),
        Some(Err(err)) => cmd::fail(err, exitcode::USAGE),
        None => None,
    };
    match config.template_dir(explicit) {
        Some(dir) => TemplateTree::new(dir),
        None => cmd::fail(
            "No template directory configured; use --template or KICAD_INIT_TEMPLATE.",
            exitcode::CONFIG,
        ),
    }
}

fn new_args(matches: &ArgMatches) -> cmd::new::NewArgs {
    cmd::new::NewArgs {
        location: matches.value_of(cmd::new::LOCATION_ARG).map(str::to_string),
        fields: FieldArgs::from_matches(matches),
        pcb_template: matches
            .value_of(cmd::new::PCB_TEMPLATE_ARG)
            .map(str::to_string),
        // Already checked by the argument's validator.
        license: matches
            .value_of(cmd::new::LICENSE_ARG)
            .and_then(|value| value.parse().ok()),
    }
}

fn pick_mode() -> Option<Mode> {
    let labels: Vec<String> = Mode::ALL
        .iter()
        .map(|mode| format!("{:<7} {}", mode, mode.describe()))
        .collect();
    match ui::picker::choose("What would you like to do?", &labels, 0) {
        Ok(choice) => choice.map(|i| Mode::ALL[i]),
        Err(err) => cmd::fail(format!("Could not show the choices: {}", err), exitcode::IOERR),
    }
}

fn main() {
    let matches = app().get_matches();

    Verbosity::from(matches.occurrences_of("v")).init_logging();
    let mut config = load_config(&matches);

    match matches.subcommand() {
        (cmd::new::CMD_STR, Some(sub_matches)) => {
            let template = template_tree(&config, sub_matches);
            cmd::new::new(&mut config, &template, new_args(sub_matches));
        }
        (cmd::update::CMD_STR, Some(sub_matches)) => {
            let template = template_tree(&config, sub_matches);
            let board_file = sub_matches
                .value_of(cmd::update::BOARD_FILE_ARG)
                .unwrap_or_default();
            cmd::update::update(
                &config,
                &template,
                board_file,
                FieldArgs::from_matches(sub_matches),
            );
        }
        (cmd::list::CMD_STR, Some(sub_matches)) => {
            cmd::list::list(&template_tree(&config, sub_matches));
        }
        _ => {
            let template = template_tree(&config, &matches);
            match pick_mode() {
                Some(Mode::New) => cmd::new::new(
                    &mut config,
                    &template,
                    new_args(&ArgMatches::default()),
                ),
                Some(Mode::Update) => {
                    let board_file = cmd::prompt_text("Board file (.kicad_pcb)", None, true);
                    cmd::update::update(&config, &template, &board_file, FieldArgs::default());
                }
                None => println!("{}", "Aborted.".dimmed()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_every_field_as_a_flag() {
        let matches = app().get_matches_from(vec![
            "kicad-init",
            "new",
            "/tmp",
            "--project",
            "Rover",
            "--board",
            "Mainboard",
            "--designer",
            "Jane",
            "--license",
            "apache-2-0",
            "--pcb-template",
            "JLCPCB_1.6mm_4",
            "--yes",
        ]);
        let (name, sub_matches) = matches.subcommand();
        assert_eq!(name, "new");
        let args = new_args(sub_matches.unwrap());
        assert_eq!(args.location.as_deref(), Some("/tmp"));
        assert_eq!(args.fields.project.as_deref(), Some("Rover"));
        assert_eq!(args.license, Some(License::Apache2));
        assert_eq!(args.pcb_template.as_deref(), Some("JLCPCB_1.6mm_4"));
        assert!(args.fields.assume_yes);
    }

    #[test]
    fn unknown_license_is_rejected() {
        let result = app().get_matches_from_safe(vec!["kicad-init", "new", "--license", "wtfpl"]);
        assert!(result.is_err());
    }

    #[test]
    fn update_requires_a_board_file() {
        assert!(app()
            .get_matches_from_safe(vec!["kicad-init", "update"])
            .is_err());
        let matches = app()
            .get_matches_from_safe(vec!["kicad-init", "-v", "update", "board.kicad_pcb", "--yes"])
            .unwrap();
        assert_eq!(matches.occurrences_of("v"), 1);
    }
}
