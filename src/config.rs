use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Name of the template tree inside the data directory.
pub const TEMPLATE_DIR_NAME: &str = "__Project__";

/// Given the base configuration folder path, returns
/// the path of the configuration JSON file.
fn get_json_path(config_path: &Path) -> PathBuf {
    config_path.join("config.json")
}

/// Where the template tree is looked for when nothing else says
/// otherwise: `(data directory)/kicad-init/__Project__`.
pub fn default_template_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("kicad-init").join(TEMPLATE_DIR_NAME))
}

/// Values remembered between runs to pre-fill prompts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub designer: Option<String>,
    pub company: Option<String>,
    pub location: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: super::VERSION.to_string(),
            template_dir: None,
            defaults: Defaults::default(),
        }
    }
}

impl Config {
    fn load_config(path: &Path) -> Result<Option<Config>, ConfigError> {
        let json_path = get_json_path(path);
        if !json_path.exists() {
            return Ok(None);
        }
        if !json_path.is_file() {
            return Err(ConfigError::NotAFile(json_path));
        }
        let json_file = fs::File::open(&json_path).map_err(ConfigError::Read)?;
        let reader = BufReader::new(json_file);
        serde_json::from_reader::<_, Config>(reader)
            .map_err(|e| ConfigError::BadDeserialization(e, json_path))
            .map(Some)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration JSON path ('{}') exists, but is not a file!", .0.display())]
    NotAFile(PathBuf),
    #[error("Error opening the configuration JSON file for reading: {0}")]
    Read(#[source] io::Error),
    #[error("Error opening the configuration JSON file for writing: {0}")]
    Write(#[source] io::Error),
    #[error(
        "Error parsing the configuration JSON file: {}\n\
        You can attempt to fix the file manually, or delete it \
        (you will lose your configuration).\n\
        The configuration file can be found in '{}'",
        .0,
        .1.display()
    )]
    BadDeserialization(#[source] serde_json::Error, PathBuf),
    #[error(
        "Error writing the configuration to file: {}\n\
        This session's changes have not been saved.\n\
        The configuration file can be found in '{}'.",
        .0,
        .1.display()
    )]
    BadSerialization(#[source] serde_json::Error, PathBuf),
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    path: PathBuf,
}

impl LoadedConfig {
    pub fn load_config(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Config::load_config(&path)?.unwrap_or_default();
        Ok(LoadedConfig { config, path })
    }

    pub fn write_config(&self) -> Result<(), ConfigError> {
        let json_path = get_json_path(&self.path);
        if json_path.exists() && !json_path.is_file() {
            return Err(ConfigError::NotAFile(json_path));
        }
        fs::create_dir_all(&self.path).map_err(ConfigError::Write)?;
        let json_file = fs::File::create(&json_path).map_err(ConfigError::Write)?;
        let writer = BufWriter::new(json_file);
        serde_json::to_writer_pretty(writer, &self.config)
            .map_err(|e| ConfigError::BadSerialization(e, json_path))
    }

    /// The template tree to use: an explicit choice (command line or
    /// environment) wins over the configured one, which wins over the
    /// default location.
    pub fn template_dir(&self, explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit
            .or_else(|| self.config.template_dir.clone())
            .or_else(default_template_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = LoadedConfig::load_config(dir.path().to_path_buf()).unwrap();
        assert_eq!(loaded.config, Config::default());
    }

    #[test]
    fn remembered_defaults_survive_a_round_trip() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("kicad-init");
        let mut loaded = LoadedConfig::load_config(config_dir.clone()).unwrap();
        loaded.config.defaults.designer = Some("Jane".into());
        loaded.config.template_dir = Some(PathBuf::from("/opt/template"));
        loaded.write_config().unwrap();

        let reloaded = LoadedConfig::load_config(config_dir).unwrap();
        assert_eq!(reloaded.config.defaults.designer.as_deref(), Some("Jane"));
        assert_eq!(
            reloaded.template_dir(None),
            Some(PathBuf::from("/opt/template"))
        );
        assert_eq!(
            reloaded.template_dir(Some(PathBuf::from("/cli"))),
            Some(PathBuf::from("/cli"))
        );
    }

    #[test]
    fn broken_file_names_its_location() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        let err = LoadedConfig::load_config(dir.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, ConfigError::BadDeserialization(..)));
        let message = err.to_string();
        assert!(message.starts_with("Error parsing the configuration JSON file: key must be a string"));
        assert!(message.ends_with(&format!("found in '{}'", dir.path().join("config.json").display())));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"version": "0.0.1"}"#).unwrap();
        let loaded = LoadedConfig::load_config(dir.path().to_path_buf()).unwrap();
        assert_eq!(loaded.config.version, "0.0.1");
        assert_eq!(loaded.config.defaults, Defaults::default());
    }
}
