use termion::event::Key;
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::ui::{UiState, UiStateReaction};

/// Key, footer label and help text of each binding.
pub const BINDINGS: &[(&str, &str, &str)] = &[
    ("↑/k", "up", "previous entry"),
    ("↓/j", "down", "next entry"),
    ("enter", "select", "choose the highlighted entry"),
    ("?", "help", "show this help"),
    ("esc/q", "cancel", "leave without choosing"),
];

/// One line footer listing the bindings, on a green background.
pub fn draw_footer(f: &mut Frame<impl Backend>, area: Rect) {
    let text = BINDINGS
        .iter()
        .map(|(key, label, _)| format!("[{}] {}", key, label))
        .collect::<Vec<_>>()
        .join("  ");
    f.render_widget(
        Paragraph::new(text).style(Style::default().bg(Color::Green).fg(Color::Black)),
        area,
    );
}

/// Full screen help. Any key goes back to the state it was opened from.
pub struct HelpUi<B>
where
    B: Backend,
{
    previous: Box<dyn UiState<B>>,
}

impl<B> HelpUi<B>
where
    B: Backend,
{
    pub fn new(previous: Box<dyn UiState<B>>) -> Self {
        HelpUi { previous }
    }
}

impl<B> UiState<B> for HelpUi<B>
where
    B: Backend + 'static,
{
    fn on_key(self: Box<Self>, _key: Key) -> UiStateReaction<B> {
        UiStateReaction::ChangeState(self.previous)
    }

    fn draw(&mut self, f: &mut Frame<B>) {
        let mut lines: Vec<Spans> = BINDINGS
            .iter()
            .map(|(key, _, what)| {
                Spans::from(vec![
                    Span::styled(format!("{:>8}", key), Style::default().fg(Color::Green)),
                    Span::raw(format!("  {}", what)),
                ])
            })
            .collect();
        lines.push(Spans::from(""));
        lines.push(Spans::from("Press any key to go back."));
        let help = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, f.size());
    }
}
