use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    text::Text,
    widgets::Paragraph,
};

pub trait ListElement {
    fn get_list_element(&self) -> Text<'static>;
}

impl ListElement for String {
    fn get_list_element(&self) -> Text<'static> {
        Text::raw(self.clone())
    }
}

/// A vertical list with one highlighted entry that scrolls to keep the
/// highlight in view.
pub struct List<T>
where
    T: ListElement,
{
    highlight: usize,
    buffer_start: usize,
    elements: Vec<T>,
}

impl<T> List<T>
where
    T: ListElement,
{
    pub fn new(elements: Vec<T>) -> Self {
        List {
            highlight: 0,
            buffer_start: 0,
            elements,
        }
    }

    /// Starts with `index` highlighted, if it is in range.
    pub fn with_highlight(mut self, index: usize) -> Self {
        if index < self.elements.len() {
            self.highlight = index;
        }
        self
    }

    pub fn highlighted(&self) -> usize {
        self.highlight
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn go_up(&mut self) {
        self.highlight = if self.highlight == 0 {
            self.elements.len().saturating_sub(1)
        } else {
            self.highlight - 1
        };
    }

    pub fn go_down(&mut self) {
        self.highlight = if self.highlight >= self.elements.len().saturating_sub(1) {
            0
        } else {
            self.highlight + 1
        };
    }

    pub fn draw(&mut self, f: &mut tui::Frame<impl Backend>, size: Rect) {
        let height = size.height as usize;
        if height == 0 {
            return;
        }
        if self.highlight < self.buffer_start {
            self.buffer_start = self.highlight;
        } else if self.highlight >= self.buffer_start + height {
            self.buffer_start = self.highlight + 1 - height;
        }

        let total = self.elements.len();
        let buffer_start = self.buffer_start;
        let buffer_end = std::cmp::min(buffer_start + height, total);
        for (i, list_elem) in self.elements[buffer_start..buffer_end].iter().enumerate() {
            let show_up_indicator = i == 0 && buffer_start > 0;
            let show_down_indicator = buffer_end < total && i == buffer_end - buffer_start - 1;
            let render_y = size.top() + i as u16;

            let mut line_width = size.width;
            if show_up_indicator || show_down_indicator {
                let indicator = if show_up_indicator { "▲" } else { "▼" };
                let render_to = Rect::new(size.right().saturating_sub(1), render_y, 1, 1);
                f.render_widget(Paragraph::new(indicator), render_to);
                line_width = line_width.saturating_sub(1);
            }

            let mut entry_style = Style::default();
            if self.highlight == buffer_start + i {
                entry_style = entry_style.bg(Color::DarkGray).fg(Color::White);
            }
            let entry_paragraph = Paragraph::new(list_elem.get_list_element()).style(entry_style);
            f.render_widget(entry_paragraph, Rect::new(size.left(), render_y, line_width, 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize) -> List<String> {
        List::new((0..n).map(|i| format!("entry {}", i)).collect())
    }

    #[test]
    fn movement_wraps_around() {
        let mut list = list(3);
        list.go_up();
        assert_eq!(list.highlighted(), 2);
        list.go_down();
        assert_eq!(list.highlighted(), 0);
        list.go_down();
        assert_eq!(list.highlighted(), 1);
    }

    #[test]
    fn out_of_range_highlight_is_ignored() {
        assert_eq!(list(2).with_highlight(5).highlighted(), 0);
        assert_eq!(list(2).with_highlight(1).highlighted(), 1);
    }

    #[test]
    fn empty_list_stays_put() {
        let mut list = list(0);
        list.go_down();
        list.go_up();
        assert_eq!(list.highlighted(), 0);
        assert!(list.is_empty());
    }
}
