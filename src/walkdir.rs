//! Depth-first listing of a directory tree as an async stream.
//!
//! Built on Shepmaster's answer on [StackOverflow:56717139][0].
//!
//! [0]: https://stackoverflow.com/a/58825638
use futures::{stream, Stream, StreamExt};
use std::{io, path::PathBuf};
use tokio::fs;

/// One entry of a walked tree. Symbolic links are resolved, so `is_dir`
/// describes what the link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

async fn read_level(dir: PathBuf, pending: &mut Vec<PathBuf>) -> io::Result<Vec<WalkEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut level = Vec::new();
    while let Some(child) = reader.next_entry().await? {
        let path = child.path();
        let is_dir = fs::metadata(&path).await?.is_dir();
        if is_dir {
            pending.push(path.clone());
        }
        level.push(WalkEntry { path, is_dir });
    }
    Ok(level)
}

/// Yields every entry below `root`, directories included so that empty
/// ones can be reproduced. A directory always comes before its contents.
pub fn visit(root: impl Into<PathBuf>) -> impl Stream<Item = io::Result<WalkEntry>> + 'static {
    stream::unfold(vec![root.into()], |mut pending| async {
        let dir = pending.pop()?;
        let level = match read_level(dir, &mut pending).await {
            Ok(level) => stream::iter(level).map(Ok).left_stream(),
            Err(e) => stream::once(async { Err(e) }).right_stream(),
        };
        Some((level, pending))
    })
    .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn walk(root: PathBuf) -> Vec<io::Result<WalkEntry>> {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(visit(root).collect::<Vec<_>>())
    }

    #[test]
    fn lists_parents_before_children() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/file.txt"), "x").unwrap();

        let entries: Vec<WalkEntry> = walk(dir.path().to_path_buf())
            .into_iter()
            .map(Result::unwrap)
            .collect();
        let position = |p: &str| {
            entries
                .iter()
                .position(|e| e.path == dir.path().join(p))
                .unwrap()
        };
        assert_eq!(entries.len(), 3);
        assert!(position("a") < position("a/b"));
        assert!(position("a/b") < position("a/b/file.txt"));
        assert!(entries[position("a/b")].is_dir);
        assert!(!entries[position("a/b/file.txt")].is_dir);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let entries = walk(dir.path().join("missing"));
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_err());
    }
}
