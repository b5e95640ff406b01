const SPINNER_CHARS: &[&str] = &[
    "⠉", "⠋", "⠍", "⠎", "⡅", "⡇", "⡆", "⣄", "⣠", "⣈", "⣘", "⢱",
];

/// Progress indicator for long file operations.
#[derive(Debug, Default)]
pub struct Spinner {
    idx: usize,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one frame and returns it.
    pub fn tick(&mut self) -> &'static str {
        self.idx = (self.idx + 1) % SPINNER_CHARS.len();
        SPINNER_CHARS[self.idx]
    }
}
