use chrono::Local;
use colored::Colorize;
use read_input::prelude::*;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::{
    cmd::{self, FieldArgs},
    config::LoadedConfig,
    license::{HttpLicenseSource, License},
    materialize::{self, CreatedProject},
    project::{self, ProjectError, ProjectInputs, ProjectMetadata, StepStatus},
    template::{PcbTemplate, TemplateTree},
    ui::picker,
    userpath::{self, UserDir},
};

pub const CMD_STR: &str = "new";
pub const LOCATION_ARG: &str = "LOCATION";
pub const PCB_TEMPLATE_ARG: &str = "pcb-template";
pub const LICENSE_ARG: &str = "license";

pub struct NewArgs {
    pub location: Option<String>,
    pub fields: FieldArgs,
    pub pcb_template: Option<String>,
    pub license: Option<License>,
}

fn ask_location(config: &LoadedConfig, given: Option<String>, assume_yes: bool) -> PathBuf {
    let default = config
        .config
        .defaults
        .location
        .clone()
        .filter(|dir| dir.is_dir())
        .or_else(dirs::home_dir)
        .or_else(|| std::env::current_dir().ok());

    if let Some(given) = given {
        return match userpath::to_user_dir(&given) {
            Ok(dir) => dir.path_buf,
            Err(message) => cmd::fail(message, exitcode::USAGE),
        };
    }
    match default {
        Some(default) if assume_yes => default,
        Some(default) => {
            let prompt = format!(
                "Project location {}: ",
                format!("[default: {}]", default.to_string_lossy()).dimmed()
            );
            input::<UserDir>()
                .repeat_msg(prompt)
                .default(UserDir::from(default))
                .err("Cannot use that location: it must be an existing directory.".red())
                .get()
                .path_buf
        }
        None => {
            input::<UserDir>()
                .repeat_msg("Project location: ")
                .err("Cannot use that location: it must be an existing directory.".red())
                .get()
                .path_buf
        }
    }
}

fn ask_pcb_template(
    discovered: &[PcbTemplate],
    given: Option<&str>,
    assume_yes: bool,
) -> Option<PcbTemplate> {
    if given.is_some() || assume_yes {
        return match project::select_pcb_template(discovered, given) {
            Ok(template) => Some(template),
            Err(err) => cmd::fail(err, exitcode::DATAERR),
        };
    }
    let labels: Vec<String> = discovered.iter().map(ToString::to_string).collect();
    match picker::choose("Select a PCB template", &labels, 0) {
        Ok(choice) => choice.map(|i| discovered[i].clone()),
        Err(err) => cmd::fail(format!("Could not show the choices: {}", err), exitcode::IOERR),
    }
}

fn ask_license(given: Option<License>, assume_yes: bool) -> Option<License> {
    if given.is_some() {
        return given;
    }
    if assume_yes {
        return Some(License::Mit);
    }
    let labels: Vec<String> = License::ALL.iter().map(ToString::to_string).collect();
    match picker::choose("Select a license", &labels, 0) {
        Ok(choice) => choice.map(|i| License::ALL[i]),
        Err(err) => cmd::fail(format!("Could not show the choices: {}", err), exitcode::IOERR),
    }
}

fn report_created(created: &CreatedProject, inputs: &ProjectInputs) {
    let meta = &inputs.metadata;
    println!("{}", "Project created successfully!".green());
    println!();
    println!("Location: {}", created.path.to_string_lossy());
    println!("Project: {}", meta.project_name);
    println!("Board: {}", meta.board_name);
    if let Some(StepStatus::Done) = created.report.status_of(materialize::STEP_LICENSE) {
        println!("License: {}", inputs.license);
    }
    println!();
    println!(
        "You can now open the project in KiCad:\n{}",
        created.project_file().to_string_lossy().yellow()
    );

    if !created.report.is_clean() {
        println!();
        println!("{}", "Steps that were skipped or failed:".yellow());
        for (step, status) in &created.report.steps {
            if let StepStatus::Skipped(reason) = status {
                println!("  {} {} ({})", "skipped".dimmed(), step, reason);
            }
        }
        for (step, reason) in created.report.failures() {
            println!("  {} {} ({})", "failed".red(), step, reason);
        }
    }
}

fn remember_defaults(config: &mut LoadedConfig, inputs: &ProjectInputs) {
    let defaults = &mut config.config.defaults;
    defaults.designer = Some(inputs.metadata.designer.trim().to_string());
    defaults.company = Some(inputs.metadata.company.trim().to_string()).filter(|c| !c.is_empty());
    defaults.location = Some(inputs.location.clone());
    if let Err(err) = config.write_config() {
        warn!("{}", err);
    }
}

pub fn new(config: &mut LoadedConfig, template: &TemplateTree, args: NewArgs) {
    if !template.exists() {
        println!("{}", "Template directory not found!".red());
        println!("Expected: {}", template.root().to_string_lossy());
        println!(
            "Point {} at a template tree, or set {}.",
            "--template".yellow(),
            "KICAD_INIT_TEMPLATE".yellow()
        );
        std::process::exit(exitcode::CONFIG);
    }

    let discovered = template.scan_pcb_templates();
    if discovered.is_empty() {
        cmd::fail(project::ValidationError::NoPcbTemplates, exitcode::DATAERR);
    }
    debug!("Found {} PCB templates", discovered.len());

    let assume_yes = args.fields.assume_yes;
    let location = ask_location(config, args.location, assume_yes);
    let defaults = ProjectMetadata {
        designer: config.config.defaults.designer.clone().unwrap_or_default(),
        company: config.config.defaults.company.clone().unwrap_or_default(),
        ..ProjectMetadata::default()
    };
    let metadata = args.fields.resolve(&defaults);

    let pcb_template = match ask_pcb_template(&discovered, args.pcb_template.as_deref(), assume_yes) {
        Some(template) => template,
        None => {
            println!("Aborted.");
            return;
        }
    };
    let license = match ask_license(args.license, assume_yes) {
        Some(license) => license,
        None => {
            println!("Aborted.");
            return;
        }
    };

    let inputs = ProjectInputs {
        location,
        metadata,
        pcb_template: Some(pcb_template),
        license,
    };
    if let Err(err) = inputs.validate(&discovered) {
        cmd::fail(format!("Validation error: {}", err), exitcode::DATAERR);
    }

    let licenses = HttpLicenseSource::default();
    let today = Local::now().date_naive();
    match materialize::create_project(template, &inputs, &licenses, today) {
        Ok(created) => {
            report_created(&created, &inputs);
            remember_defaults(config, &inputs);
        }
        Err(err @ ProjectError::DestinationExists(_)) => cmd::fail(err, exitcode::CANTCREAT),
        Err(err @ ProjectError::TemplateMissing(_)) => cmd::fail(err, exitcode::CONFIG),
        Err(err) => cmd::fail(format!("Failed to create project: {}", err), exitcode::IOERR),
    }
}
