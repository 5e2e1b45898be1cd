//! Terminal output for the command-line interface

mod renderer;
mod spinner;
mod theme;

pub use renderer::TerminalRenderer;
pub use spinner::Spinner;
pub use theme::Theme;
