use colored::{ColoredString, Colorize};
use std::fmt::Display;

/// Scoped status printer.
///
/// Each line is `<prefix> [ STATUS  ] message`, the prefix rendered faint
/// and italic so nested steps read like an outline:
///
/// ```text
/// [ Info    ] Processing repository 'luna'
/// - [ Info    ] Golang package/project detected
/// ----- [ OK      ] Branch 'robot-works-…' created
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScopePrinter {
    prefix: String,
}

impl ScopePrinter {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// A printer one level deeper.
    pub fn nested(&self, extra: &str) -> Self {
        Self {
            prefix: format!("{}{}", self.prefix, extra),
        }
    }

    pub fn ok(&self, message: impl Display) {
        println!("{}", self.line(" OK      ".green(), message));
    }

    pub fn skipped(&self, message: impl Display) {
        println!("{}", self.line(" Skipped ".yellow(), message));
    }

    pub fn info(&self, message: impl Display) {
        println!("{}", self.line(" Info    ".blue(), message));
    }

    pub fn error(&self, message: impl Display) {
        println!("{}", self.line(" Error   ".red(), message));
    }

    fn line(&self, status: ColoredString, message: impl Display) -> String {
        if self.prefix.is_empty() {
            format!("[{}] {}", status, message)
        } else {
            format!("{} [{}] {}", self.prefix.dimmed().italic(), status, message)
        }
    }
}

/// Faint separator printed before the run summary.
pub fn banner(title: &str) -> String {
    format!("------- {} -------", title).dimmed().to_string()
}
