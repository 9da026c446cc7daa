//! Terminal status output. Everything goes to stderr so that command output
//! on stdout stays machine-readable.

use std::io::Write;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Action,
    Warning,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Action => Style::new().green().bold(),
            Tone::Warning => Style::new().yellow().bold(),
        }
    }
}

fn print_status(tone: Tone, label: &str, message: &str) {
    let _ = writeln!(
        std::io::stderr(),
        "{:>12} {message}",
        tone.style().apply_to(label)
    );
}

/// Print a status line such as `   Resolving org.example:app:1.0`, with the
/// label right-aligned to 12 columns in bold green.
pub fn status(label: &str, message: &str) {
    print_status(Tone::Action, label, message);
}

/// Same as [`status`] with a bold yellow label.
pub fn status_warn(label: &str, message: &str) {
    print_status(Tone::Warning, label, message);
}

/// A steadily ticking spinner for work of unknown length. Finish it with
/// [`ProgressBar::finish_and_clear`].
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
