//! Layout of the bundled project template tree, and discovery of the PCB
//! stack-up variants shipped inside its `hardware/` directory.

use regex::Regex;
use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};
use tracing::{debug, warn};

/// Generic name of the board directory inside the template tree.
pub const HARDWARE_DIR: &str = "hardware";
/// Stem shared by the template's schematic, PCB and project files.
pub const PLACEHOLDER_STEM: &str = "Template";
/// Name the selected PCB variant is installed under before renaming.
pub const ACTIVE_PCB_FILE: &str = "Template.kicad_pcb";
/// Top-level directories that may be backfilled into existing projects.
pub const OPTIONAL_DIRS: [&str; 4] = ["firmware", "3d-print", "cad", ".github"];
/// Directories that receive a copy of the project license, besides the board.
pub const LICENSED_DIRS: [&str; 3] = ["firmware", "3d-print", "cad"];

const PCB_TEMPLATE_GLOB: &str = "Template - *.kicad_pcb";
const PLACEHOLDER_FILES_GLOB: &str = "Template.*";

fn pcb_template_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^Template - ([^_]+)_([^_]+)_(\d+)-layer\.kicad_pcb$")
            .expect("PCB template pattern is valid")
    })
}

fn glob_pattern(pattern: &str) -> glob::Pattern {
    glob::Pattern::new(pattern).expect("built-in glob patterns are valid")
}

/// One selectable PCB variant, e.g. `Template - JLCPCB_1.6mm_4-layer.kicad_pcb`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcbTemplate {
    pub file_name: String,
    pub manufacturer: String,
    pub thickness: String,
    pub layers: String,
}

impl PcbTemplate {
    /// Parses a file name against
    /// `Template - <manufacturer>_<thickness>_<layers>-layer.kicad_pcb`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = pcb_template_regex().captures(file_name)?;
        Some(PcbTemplate {
            file_name: file_name.to_string(),
            manufacturer: captures[1].to_string(),
            thickness: captures[2].to_string(),
            layers: captures[3].to_string(),
        })
    }

    /// The `<manufacturer>_<thickness>_<layers>` part of the file name.
    pub fn short_name(&self) -> String {
        format!("{}_{}_{}", self.manufacturer, self.thickness, self.layers)
    }

    /// Whether a user supplied selector names this template. Accepts the
    /// full file name or the short name, ignoring case.
    pub fn is_named(&self, selector: &str) -> bool {
        let selector = selector.trim();
        selector.eq_ignore_ascii_case(&self.file_name)
            || selector.eq_ignore_ascii_case(&self.short_name())
    }
}

impl Display for PcbTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} - {} layers",
            self.manufacturer, self.thickness, self.layers
        )
    }
}

/// The template tree a project is created from.
#[derive(Clone, Debug)]
pub struct TemplateTree {
    root: PathBuf,
}

impl TemplateTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TemplateTree { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn hardware_dir(&self) -> PathBuf {
        self.root.join(HARDWARE_DIR)
    }

    /// Lists the PCB variants in `hardware/`, sorted by file name. Files
    /// that do not follow the naming grammar are skipped, and a missing
    /// directory yields an empty list.
    pub fn scan_pcb_templates(&self) -> Vec<PcbTemplate> {
        let hardware_dir = self.hardware_dir();
        if !hardware_dir.is_dir() {
            debug!("No hardware directory in {}", self.root.display());
            return vec![];
        }
        let mut templates: Vec<PcbTemplate> = pcb_template_files(&hardware_dir)
            .into_iter()
            .filter_map(|path| {
                let file_name = path.file_name()?.to_str()?;
                let parsed = PcbTemplate::parse(file_name);
                if parsed.is_none() {
                    debug!("Skipping {}: not a PCB template name", file_name);
                }
                parsed
            })
            .collect();
        templates.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        templates
    }
}

/// Regular files directly inside `dir` whose names match `pattern`.
fn files_matching(dir: &Path, pattern: &glob::Pattern) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Could not read directory {}: {}", dir.display(), err);
            return vec![];
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| pattern.matches(name))
        })
        .collect();
    files.sort();
    files
}

/// Every `Template - *.kicad_pcb` file in `dir`, whether or not the rest
/// of the name follows the grammar.
pub fn pcb_template_files(dir: &Path) -> Vec<PathBuf> {
    files_matching(dir, &glob_pattern(PCB_TEMPLATE_GLOB))
}

/// Every `Template.*` file in `dir`.
pub fn placeholder_files(dir: &Path) -> Vec<PathBuf> {
    files_matching(dir, &glob_pattern(PLACEHOLDER_FILES_GLOB))
}
