use crate::{
    ui::spinner::Spinner,
    walkdir::{self, WalkEntry},
};
use futures::StreamExt;
use std::{
    io::{self, Write},
    path::Path,
};
use tracing::{debug, warn};

async fn copy_entry(entry: &WalkEntry, to: &Path) -> io::Result<()> {
    if entry.is_dir {
        if !to.exists() {
            tokio::fs::create_dir(to).await?;
        }
    } else {
        if let Some(parent) = to.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::copy(&entry.path, to).await?;
    }
    Ok(())
}

/// Copies everything below `from_base_dir` into `to_base_dir`, which must
/// already exist.
async fn recursive_copy(from_base_dir: &Path, to_base_dir: &Path, progress: bool) -> io::Result<()> {
    let mut spinner = Spinner::new();
    let terminal_width = termion::terminal_size().map(|(w, _)| w).unwrap_or(0) as usize;
    let mut entries = Box::pin(walkdir::visit(from_base_dir));

    while let Some(entry) = entries.next().await {
        let entry = entry?;
        let relative = match entry.path.strip_prefix(from_base_dir) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        if progress {
            let name = relative.to_string_lossy();
            let shown = terminal_width.saturating_sub(8);
            let name: String = name
                .chars()
                .skip(name.chars().count().saturating_sub(shown))
                .collect();
            let whitespace = " ".repeat(terminal_width.saturating_sub(name.chars().count() + 10));
            let symbol = spinner.tick();
            print!("{} {}{} {}\r", symbol, name, whitespace, symbol);
            io::stdout().flush().ok();
        }

        copy_entry(&entry, &to_base_dir.join(relative)).await?;
    }

    if progress {
        print!("{}\r", " ".repeat(terminal_width));
        io::stdout().flush().ok();
    }
    Ok(())
}

/// Copies the tree at `from` to the new directory `to`, creating its
/// parents as needed. Fails if `to` already exists. If copying fails
/// halfway, whatever was copied is removed again.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir(to)?;
    debug!("Copying {} to {}", from.display(), to.display());

    let progress = termion::is_tty(&io::stdout());
    let result = tokio::runtime::Builder::new_current_thread()
        .build()
        .and_then(|runtime| runtime.block_on(recursive_copy(from, to, progress)));

    if let Err(err) = &result {
        warn!("Copy failed ({}); cleaning up {}", err, to.display());
        std::fs::remove_dir_all(to).ok();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn copies_nested_files_and_empty_dirs() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from");
        fs::create_dir_all(from.join("a/b")).unwrap();
        fs::create_dir_all(from.join("empty")).unwrap();
        fs::write(from.join("top.txt"), "top").unwrap();
        fs::write(from.join("a/b/deep.txt"), "deep").unwrap();

        let to = dir.path().join("to");
        copy_tree(&from, &to).unwrap();

        assert_eq!(fs::read_to_string(to.join("top.txt")).unwrap(), "top");
        assert_eq!(fs::read_to_string(to.join("a/b/deep.txt")).unwrap(), "deep");
        assert!(to.join("empty").is_dir());
    }

    #[test]
    fn refuses_existing_destination() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from");
        fs::create_dir(&from).unwrap();
        fs::write(from.join("x"), "new").unwrap();
        let to = dir.path().join("to");
        fs::create_dir(&to).unwrap();
        fs::write(to.join("x"), "old").unwrap();

        let err = copy_tree(&from, &to).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(to.join("x")).unwrap(), "old");
    }

    #[test]
    fn missing_source_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let to = dir.path().join("to");
        assert!(copy_tree(&dir.path().join("nope"), &to).is_err());
        assert!(!to.exists());
    }
}
