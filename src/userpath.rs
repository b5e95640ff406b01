use colored::Colorize;
use shellexpand::LookupError;
use std::{
    env::VarError,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserPathError {
    #[error("Error resolving the given path: {0}")]
    ShellExpand(#[from] LookupError<VarError>),
    #[error("{}", describe_io(.path, .source))]
    Canonicalize {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a directory.")]
    NotDirectory(String),
}

fn describe_io(path: &str, err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => format!("{} does not exist.", path),
        io::ErrorKind::PermissionDenied => format!("Permission denied for {}", path),
        _ => format!("{}: {}", path, err),
    }
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand(path: &str) -> Result<PathBuf, UserPathError> {
    Ok(PathBuf::from(shellexpand::full(path)?.as_ref()))
}

/// Expands a user supplied path and resolves it to an existing
/// canonical path.
pub fn resolve(path: &str) -> Result<PathBuf, UserPathError> {
    expand(path)?
        .canonicalize()
        .map_err(|source| UserPathError::Canonicalize {
            path: path.to_string(),
            source,
        })
}

/// An existing directory given by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct UserDir {
    pub path_buf: PathBuf,
}

impl std::fmt::Debug for UserDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.path_buf.fmt(f)
    }
}

impl FromStr for UserDir {
    type Err = UserPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path_buf = resolve(s.trim())?;
        if !path_buf.is_dir() {
            return Err(UserPathError::NotDirectory(s.to_string()));
        }
        Ok(UserDir { path_buf })
    }
}

impl From<PathBuf> for UserDir {
    fn from(path_buf: PathBuf) -> Self {
        UserDir { path_buf }
    }
}

impl AsRef<Path> for UserDir {
    fn as_ref(&self) -> &Path {
        &self.path_buf
    }
}

impl std::fmt::Display for UserDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path_buf.to_string_lossy())
    }
}

/// Tries to convert a given user path to a `UserDir`, returning a
/// message for the user if it fails.
pub fn to_user_dir(path: &str) -> Result<UserDir, String> {
    UserDir::from_str(path).map_err(|e| match e {
        UserPathError::Canonicalize { ref source, .. }
            if source.kind() == io::ErrorKind::NotFound =>
        {
            format!(
                "{}\n{}",
                e.to_string().red(),
                "The location is the parent directory of the new project, \
                and must already exist."
                    .dimmed()
            )
        }
        e => e.to_string().red().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn existing_directory_resolves() {
        let dir = TempDir::new().unwrap();
        let user_dir = to_user_dir(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(user_dir.path_buf, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn files_and_missing_paths_are_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            UserDir::from_str(&file.to_string_lossy()),
            Err(UserPathError::NotDirectory(_))
        ));
        let missing = dir.path().join("missing");
        let message = to_user_dir(&missing.to_string_lossy()).unwrap_err();
        assert!(message.contains("does not exist"));
    }

    #[test]
    fn tilde_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand("~/boards").unwrap(), home.join("boards"));
        }
    }
}
