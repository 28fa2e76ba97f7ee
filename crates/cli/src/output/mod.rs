//! Output formatting utilities
//!
//! Human-readable and JSON output, progress spinners and colored messages.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::ProgressBar;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Whether spinners and bars may draw
    pub fn shows_progress(&self) -> bool {
        !(self.quiet || self.json || self.no_progress)
    }
}
