use colored::Colorize;
use read_input::prelude::*;
use std::io;
use termion::event::Key;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::Paragraph,
    Frame,
};

use crate::ui::{
    help::{self, HelpUi},
    list::List,
    UiState, UiStateReaction,
};

/// Full screen single choice from a list of labels.
pub struct PickerUi {
    title: String,
    list: List<String>,
}

impl PickerUi {
    pub fn new(title: &str, entries: Vec<String>, default: usize) -> Self {
        PickerUi {
            title: title.to_string(),
            list: List::new(entries).with_highlight(default),
        }
    }
}

impl<B> UiState<B> for PickerUi
where
    B: Backend + 'static,
{
    fn on_key(mut self: Box<Self>, key: Key) -> UiStateReaction<B> {
        match key {
            Key::Up | Key::Char('k') => self.list.go_up(),
            Key::Down | Key::Char('j') => self.list.go_down(),
            Key::Char('\n') if !self.list.is_empty() => {
                return UiStateReaction::Exit(Some(self.list.highlighted()))
            }
            Key::Esc | Key::Char('q') | Key::Ctrl('c') => return UiStateReaction::Exit(None),
            Key::Char('?') => return UiStateReaction::ChangeState(Box::new(HelpUi::new(self))),
            _ => {}
        }
        UiStateReaction::ChangeState(self)
    }

    fn draw(&mut self, f: &mut Frame<B>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(2),
                    Constraint::Min(1),
                    Constraint::Length(1),
                ]
                .as_ref(),
            )
            .split(f.size());
        f.render_widget(
            Paragraph::new(self.title.as_str()).style(Style::default().add_modifier(Modifier::BOLD)),
            chunks[0],
        );
        self.list.draw(f, chunks[1]);
        help::draw_footer(f, chunks[2]);
    }
}

/// Asks the user to choose one of `entries`, returning its index, or
/// `None` if they backed out. Uses the full screen picker on a terminal
/// and a numbered prompt otherwise.
pub fn choose(title: &str, entries: &[String], default: usize) -> io::Result<Option<usize>> {
    if entries.is_empty() {
        return Ok(None);
    }
    if crate::ui::is_interactive() {
        return crate::ui::run_ui(Box::new(PickerUi::new(title, entries.to_vec(), default)));
    }

    println!("{}", title.bold());
    for (i, entry) in entries.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, entry);
    }
    let count = entries.len();
    let default = default.min(count - 1) + 1;
    let chosen = input::<usize>()
        .repeat_msg(format!(
            "Choice {}: ",
            format!("[1-{}, default: {}]", count, default).dimmed()
        ))
        .default(default)
        .add_err_test(
            move |n| (1..=count).contains(n),
            format!("Please enter a number between 1 and {}.", count).red(),
        )
        .get();
    Ok(Some(chosen - 1))
}
