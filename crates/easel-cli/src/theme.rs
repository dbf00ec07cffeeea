//! Terminal styling for extension listings and status messages.

use colored::Colorize;

/// Column widths of the extension table.
pub(crate) const EXTENSION_COLUMNS: [usize; 5] = [24, 10, 8, 6, 8];

/// Lifecycle state shown in the extension table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExtensionState {
    Enabled,
    Disabled,
    Removed,
}

impl ExtensionState {
    fn label(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Removed => "removed",
        }
    }
}

pub(crate) struct Theme;

impl Theme {
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// State cell padded to `width` before coloring, so escape codes do not
    /// break column alignment.
    pub(crate) fn state(state: ExtensionState, width: usize) -> String {
        let cell = format!("{:<width$}", state.label());
        match state {
            ExtensionState::Enabled => cell.green().to_string(),
            ExtensionState::Disabled => cell.yellow().to_string(),
            ExtensionState::Removed => cell.dimmed().to_string(),
        }
    }

    /// Rule under a table header, one dash run per column.
    pub(crate) fn rule(widths: &[usize]) -> String {
        let line = widths
            .iter()
            .map(|width| "─".repeat(*width))
            .collect::<Vec<_>>()
            .join(" ");
        format!("  {}", line.dimmed())
    }

    /// `id  path` line of a contribution listing.
    pub(crate) fn contribution(id: &str, path: &str, width: usize) -> String {
        let id = format!("{id:<width$}");
        format!("  {} {}", id.bold(), path.dimmed())
    }
}
