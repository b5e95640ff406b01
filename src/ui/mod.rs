use std::io;
use termion::{
    event::Key,
    input::TermRead,
    raw::{IntoRawMode, RawTerminal},
    screen::AlternateScreen,
};
use tui::{
    backend::{Backend, TermionBackend},
    Frame, Terminal,
};

pub mod help;
pub mod list;
pub mod picker;
pub mod spinner;

pub enum UiStateReaction<B>
where
    B: Backend,
{
    /// Continue with the given state, which may be the same one.
    ChangeState(Box<dyn UiState<B>>),
    /// Leave the UI, with the index of the chosen entry, or `None`
    /// if the user backed out.
    Exit(Option<usize>),
}

pub trait UiState<B>
where
    B: Backend,
{
    /// Called upon input.
    fn on_key(self: Box<Self>, key: Key) -> UiStateReaction<B>;
    /// Draw the current state to the provided buffer.
    fn draw(&mut self, f: &mut Frame<B>);
}

type BackendInUse = TermionBackend<AlternateScreen<RawTerminal<io::Stdout>>>;

/// Whether both ends of the terminal are attached, so the full screen
/// picker (and the copy spinner) make sense.
pub fn is_interactive() -> bool {
    termion::is_tty(&io::stdin()) && termion::is_tty(&io::stdout())
}

/// Runs the state machine on the alternate screen until a state exits.
///
/// Keys are read on the calling thread, so once this returns nothing is
/// left listening on stdin and line prompts can follow.
pub fn run_ui(starting_state: Box<dyn UiState<BackendInUse>>) -> io::Result<Option<usize>> {
    let stdout = AlternateScreen::from(io::stdout().into_raw_mode()?);
    let mut terminal = Terminal::new(TermionBackend::new(stdout))?;
    terminal.hide_cursor()?;

    let mut state = starting_state;
    terminal.draw(|f| state.draw(f))?;

    let stdin = io::stdin();
    let mut keys = stdin.lock().keys();
    let outcome = loop {
        let key = match keys.next() {
            Some(key) => key?,
            None => break None,
        };
        match state.on_key(key) {
            UiStateReaction::ChangeState(next) => state = next,
            UiStateReaction::Exit(outcome) => break outcome,
        }
        // Redrawing also picks up terminal resizes.
        terminal.draw(|f| state.draw(f))?;
    };

    terminal.show_cursor()?;
    Ok(outcome)
}
