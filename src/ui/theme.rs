//! Terminal colors

use crossterm::style::Color;

/// Colors used by [`super::TerminalRenderer`]
pub struct Theme {
    /// Headings and report titles
    pub title: Color,
    /// Labels and secondary info
    pub dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    /// Token counts, costs and scores
    pub stats: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Color::Magenta,
            dim: Color::DarkGrey,
            success: Color::Green,
            warning: Color::DarkYellow,
            error: Color::Red,
            stats: Color::Blue,
        }
    }
}
