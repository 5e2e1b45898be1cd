//! Styled and markdown output

use super::theme::Theme;
use crossterm::style::{Color, Stylize};
use std::io::IsTerminal;
use termimad::MadSkin;

/// Writes command results to stdout and diagnostics to stderr.
///
/// Styling is applied only when stdout is a terminal, so piped output stays plain text.
pub struct TerminalRenderer {
    theme: Theme,
    skin: MadSkin,
    styled: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::with_styling(std::io::stdout().is_terminal())
    }

    pub fn with_styling(styled: bool) -> Self {
        let theme = Theme::default();
        let skin = Self::build_skin(&theme);
        Self { theme, skin, styled }
    }

    fn build_skin(theme: &Theme) -> MadSkin {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(to_termimad_color(theme.title));
        skin.bold.set_fg(to_termimad_color(Color::White));
        skin.italic.set_fg(to_termimad_color(theme.dim));
        skin.inline_code.set_fg(to_termimad_color(Color::Green));
        skin.code_block.set_fg(to_termimad_color(Color::Green));
        skin
    }

    /// Print a report, rendering markdown when styled
    pub fn render_markdown(&self, content: &str) {
        if self.styled && has_markdown_elements(content) {
            self.skin.print_text(content);
        } else {
            println!("{}", content);
        }
    }

    pub fn render_heading(&self, title: &str) {
        if self.styled {
            println!("{}", title.with(self.theme.title).bold());
        } else {
            println!("{}", title);
        }
    }

    /// `label: value` with the label padded to `width`
    pub fn render_field(&self, label: &str, value: impl std::fmt::Display, width: usize) {
        let label = format!("{:<width$}", format!("{}:", label), width = width + 1);
        if self.styled {
            println!("  {} {}", label.with(self.theme.dim), value.to_string().with(self.theme.stats));
        } else {
            println!("  {} {}", label, value);
        }
    }

    pub fn render_success(&self, msg: &str) {
        self.line("\u{2713}", msg, self.theme.success);
    }

    pub fn render_warning(&self, msg: &str) {
        if self.styled {
            eprintln!("  {} {}", "!".with(self.theme.warning), msg.with(self.theme.warning));
        } else {
            eprintln!("warning: {}", msg);
        }
    }

    pub fn render_error(&self, msg: &str) {
        if self.styled {
            eprintln!("  {} {}", "\u{2717}".with(self.theme.error), msg.with(self.theme.error));
        } else {
            eprintln!("error: {}", msg);
        }
    }

    pub fn render_info(&self, msg: &str) {
        if self.styled {
            println!("  {}", msg.with(self.theme.dim));
        } else {
            println!("{}", msg);
        }
    }

    fn line(&self, symbol: &str, msg: &str, color: Color) {
        if self.styled {
            println!("  {} {}", symbol.with(color), msg.with(color));
        } else {
            println!("{}", msg);
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn has_markdown_elements(content: &str) -> bool {
    content.contains("```")
        || content.contains("## ")
        || content.contains("# ")
        || content.contains("**")
        || content.contains("| ")
        || content.contains("- ")
}

/// termimad carries its own crossterm version
fn to_termimad_color(color: Color) -> termimad::crossterm::style::Color {
    use termimad::crossterm::style::Color as T;
    match color {
        Color::Black => T::Black,
        Color::DarkGrey => T::DarkGrey,
        Color::Red => T::Red,
        Color::DarkRed => T::DarkRed,
        Color::Green => T::Green,
        Color::DarkGreen => T::DarkGreen,
        Color::Yellow => T::Yellow,
        Color::DarkYellow => T::DarkYellow,
        Color::Blue => T::Blue,
        Color::DarkBlue => T::DarkBlue,
        Color::Magenta => T::Magenta,
        Color::DarkMagenta => T::DarkMagenta,
        Color::Cyan => T::Cyan,
        Color::DarkCyan => T::DarkCyan,
        Color::White => T::White,
        Color::Grey => T::Grey,
        _ => T::Reset,
    }
}
