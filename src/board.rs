//! The board a project is updated from. KiCad exposes the open board's
//! title block through its scripting API; [`BoardHost`] is that surface,
//! and [`PcbBoard`] provides it for a board file on disk by editing the
//! `(title_block ...)` expression in place.

use crate::metadata::{self, PCB_EXTENSION};
use regex::Regex;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("'{}' is not a KiCad board file.", .0.display())]
    NotABoard(PathBuf),
    #[error("Could not read board '{}': {}", .0.display(), .1)]
    Read(PathBuf, #[source] io::Error),
    #[error("Could not write board '{}': {}", .0.display(), .1)]
    Write(PathBuf, #[source] io::Error),
    #[error("Board '{}' has an unterminated title block.", .0.display())]
    Malformed(PathBuf),
}

/// Title block fields. Comment slots are numbered from 0, as in the
/// scripting API; the file format numbers them from 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TitleBlock {
    pub title: String,
    pub date: String,
    pub revision: String,
    pub company: String,
    pub comments: BTreeMap<u8, String>,
}

impl TitleBlock {
    pub fn comment(&self, slot: u8) -> Option<&str> {
        self.comments.get(&slot).map(String::as_str)
    }

    pub fn set_comment(&mut self, slot: u8, text: impl Into<String>) {
        self.comments.insert(slot, text.into());
    }
}

/// What the update flow needs from the CAD host's open board.
pub trait BoardHost {
    /// Where the board is saved, or `None` for a board never saved.
    fn file_name(&self) -> Option<&Path>;
    fn title_block(&self) -> TitleBlock;
    fn set_title_block(&mut self, block: TitleBlock);
    /// Flags the board as changed so the host persists it.
    fn set_modified(&mut self);
    /// Brings the host's view in line with the changes made so far.
    fn refresh(&mut self) -> Result<(), BoardError>;
}

fn field_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\((title|date|rev|company)\s+"((?:[^"\\]|\\.)*)"\s*\)"#)
            .expect("title block field pattern is valid")
    })
}

fn comment_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\(comment\s+(\d+)\s+"((?:[^"\\]|\\.)*)"\s*\)"#)
            .expect("title block comment pattern is valid")
    })
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

/// Byte index just past the parenthesis closing the expression that
/// opens at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[open..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whitespace preceding `at` on its line.
fn indent_before(text: &str, at: usize) -> &str {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..at];
    let trimmed = prefix.trim_start();
    &prefix[..prefix.len() - trimmed.len()]
}

fn parse_title_block(block: &str) -> TitleBlock {
    let mut parsed = TitleBlock::default();
    for caps in field_regex().captures_iter(block) {
        let value = unescape(&caps[2]);
        match &caps[1] {
            "title" => parsed.title = value,
            "date" => parsed.date = value,
            "rev" => parsed.revision = value,
            "company" => parsed.company = value,
            _ => {}
        }
    }
    for caps in comment_regex().captures_iter(block) {
        if let Ok(number) = caps[1].parse::<u8>() {
            if number > 0 {
                parsed.comments.insert(number - 1, unescape(&caps[2]));
            }
        }
    }
    parsed
}

fn render_title_block(block: &TitleBlock, indent: &str) -> String {
    let unit = if indent.contains('\t') { "\t" } else { "  " };
    let child = format!("{}{}", indent, unit);
    let mut out = String::from("(title_block");
    for (name, value) in [
        ("title", &block.title),
        ("date", &block.date),
        ("rev", &block.revision),
        ("company", &block.company),
    ] {
        if !value.is_empty() {
            out.push_str(&format!(
                "\n{}({} \"{}\")",
                child,
                name,
                metadata::sexpr_escape(value)
            ));
        }
    }
    for (slot, text) in &block.comments {
        if !text.is_empty() {
            out.push_str(&format!(
                "\n{}(comment {} \"{}\")",
                child,
                u16::from(*slot) + 1,
                metadata::sexpr_escape(text)
            ));
        }
    }
    out.push('\n');
    out.push_str(indent);
    out.push(')');
    out
}

/// A `.kicad_pcb` file standing in for the host's open board.
#[derive(Debug)]
pub struct PcbBoard {
    path: PathBuf,
    text: String,
    title_block: TitleBlock,
    modified: bool,
}

impl PcbBoard {
    pub fn open(path: &Path) -> Result<Self, BoardError> {
        if path.extension().map_or(true, |ext| ext != PCB_EXTENSION) {
            return Err(BoardError::NotABoard(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|e| BoardError::Read(path.to_path_buf(), e))?;
        let title_block = match text.find("(title_block") {
            Some(start) => {
                let end = matching_paren(&text, start)
                    .ok_or_else(|| BoardError::Malformed(path.to_path_buf()))?;
                parse_title_block(&text[start..end])
            }
            None => TitleBlock::default(),
        };
        Ok(PcbBoard {
            path: path.to_path_buf(),
            text,
            title_block,
            modified: false,
        })
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// The board text with the current title block spliced in.
    fn render(&self) -> String {
        let text = &self.text;
        if let Some(start) = text.find("(title_block") {
            if let Some(end) = matching_paren(text, start) {
                let block = render_title_block(&self.title_block, indent_before(text, start));
                return format!("{}{}{}", &text[..start], block, &text[end..]);
            }
        }
        // No title block yet: place one after the paper size, or else
        // before the closing parenthesis of the board.
        let anchor = text
            .find("(paper")
            .and_then(|start| matching_paren(text, start).map(|end| (start, end)));
        match anchor {
            Some((start, end)) => {
                let indent = indent_before(text, start);
                format!(
                    "{}\n{}{}{}",
                    &text[..end],
                    indent,
                    render_title_block(&self.title_block, indent),
                    &text[end..]
                )
            }
            None => {
                let end = text
                    .trim_end()
                    .char_indices()
                    .last()
                    .map_or(0, |(i, _)| i);
                format!(
                    "{}  {}\n{}",
                    &text[..end],
                    render_title_block(&self.title_block, "  "),
                    &text[end..]
                )
            }
        }
    }
}

impl BoardHost for PcbBoard {
    fn file_name(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn title_block(&self) -> TitleBlock {
        self.title_block.clone()
    }

    fn set_title_block(&mut self, block: TitleBlock) {
        self.title_block = block;
    }

    fn set_modified(&mut self) {
        self.modified = true;
    }

    /// Saves the board when it was marked modified.
    fn refresh(&mut self) -> Result<(), BoardError> {
        if !self.is_modified() {
            return Ok(());
        }
        let rendered = self.render();
        fs::write(&self.path, &rendered).map_err(|e| BoardError::Write(self.path.clone(), e))?;
        debug!("Saved {}", self.path.display());
        self.text = rendered;
        self.modified = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BOARD: &str = "(kicad_pcb (version 20221018) (generator pcbnew)\n\n  (general\n    (thickness 1.6)\n  )\n\n  (paper \"A4\")\n  (title_block\n    (title \"Old (draft)\")\n    (date \"2020-01-01\")\n    (rev \"0.1\")\n    (company \"Some \\\"Co\\\"\")\n    (comment 1 \"first\")\n    (comment 3 \"third\")\n  )\n\n  (layers\n    (0 \"F.Cu\" signal)\n  )\n)\n";

    fn board_file(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("MainBoard.kicad_pcb");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn reads_the_title_block() {
        let dir = TempDir::new().unwrap();
        let board = PcbBoard::open(&board_file(&dir, BOARD)).unwrap();
        let block = board.title_block();
        assert_eq!(block.title, "Old (draft)");
        assert_eq!(block.date, "2020-01-01");
        assert_eq!(block.revision, "0.1");
        assert_eq!(block.company, "Some \"Co\"");
        assert_eq!(block.comment(0), Some("first"));
        assert_eq!(block.comment(2), Some("third"));
        assert_eq!(block.comment(1), None);
    }

    #[test]
    fn writes_back_only_when_modified() {
        let dir = TempDir::new().unwrap();
        let path = board_file(&dir, BOARD);
        let mut board = PcbBoard::open(&path).unwrap();

        let mut block = board.title_block();
        block.title = "MainBoard".into();
        block.set_comment(0, "Motor driver");
        board.set_title_block(block);
        board.refresh().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), BOARD);

        board.set_modified();
        board.refresh().unwrap();
        assert!(!board.is_modified());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("    (title \"MainBoard\")\n"));
        assert!(written.contains("    (comment 1 \"Motor driver\")\n"));
        assert!(written.contains("    (comment 3 \"third\")\n"));
        assert!(written.contains("  )\n\n  (layers"));
        assert!(written.starts_with("(kicad_pcb (version 20221018)"));

        let reread = PcbBoard::open(&path).unwrap().title_block();
        assert_eq!(reread.company, "Some \"Co\"");
        assert_eq!(reread.title, "MainBoard");
    }

    #[test]
    fn adds_a_missing_title_block_after_the_paper() {
        let dir = TempDir::new().unwrap();
        let path = board_file(&dir, "(kicad_pcb (version 1)\n  (paper \"A4\")\n  (layers)\n)\n");
        let mut board = PcbBoard::open(&path).unwrap();
        assert_eq!(board.title_block(), TitleBlock::default());

        let mut block = TitleBlock::default();
        block.title = "MainBoard".into();
        board.set_title_block(block);
        board.set_modified();
        board.refresh().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "(kicad_pcb (version 1)\n  (paper \"A4\")\n  (title_block\n    (title \"MainBoard\")\n  )\n  (layers)\n)\n"
        );
    }

    #[test]
    fn adds_a_title_block_before_the_last_character() {
        let dir = TempDir::new().unwrap();
        let path = board_file(&dir, "(kicad_pcb (version 1)\n  (layers)\n  (net 0 \"GND\")\n) é\n");
        let mut board = PcbBoard::open(&path).unwrap();
        let mut block = TitleBlock::default();
        block.title = "MainBoard".into();
        board.set_title_block(block);
        board.set_modified();
        board.refresh().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("(title \"MainBoard\")"));
        assert!(written.ends_with("é\n"));
    }

    #[test]
    fn io_errors_name_the_board_and_the_cause() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.kicad_pcb");
        let err = PcbBoard::open(&missing).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Could not read board '"));
        assert!(message.contains("gone.kicad_pcb"));
        let cause = io::Error::from(io::ErrorKind::NotFound).to_string();
        assert!(message.ends_with(&cause));

        let write = BoardError::Write(missing, io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(write.to_string().ends_with("': disk full"));
    }

    #[test]
    fn rejects_other_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MainBoard.kicad_sch");
        fs::write(&path, "(kicad_sch)").unwrap();
        assert!(matches!(PcbBoard::open(&path), Err(BoardError::NotABoard(_))));
        assert!(matches!(
            PcbBoard::open(&dir.path().join("gone.kicad_pcb")),
            Err(BoardError::Read(..))
        ));
    }
}
