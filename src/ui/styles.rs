use ratatui::style::{Color, Modifier, Style};

use crate::karaoke::WordState;

pub struct WordStyles {
    pub past: Style,
    pub current: Style,
    pub future: Style,
    /// Overlay for the word picked with the arrow keys.
    pub selected: Style,
    /// Used for every word when highlighting is switched off.
    pub plain: Style,
}

impl WordStyles {
    pub fn for_state(&self, state: WordState) -> Style {
        match state {
            WordState::Past => self.past,
            WordState::Current => self.current,
            WordState::Future => self.future,
        }
    }
}

impl Default for WordStyles {
    fn default() -> Self {
        Self {
            past: Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
            current: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            future: Style::default(),
            selected: Style::default().add_modifier(Modifier::UNDERLINED),
            plain: Style::default(),
        }
    }
}
