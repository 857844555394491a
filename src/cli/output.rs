//! Terminal output for the `gemelo-server` subcommands.
//!
//! Every line starts with a [`Mark`]. Colored output draws it as a symbol;
//! `--no-color` output uses a bracketed tag so logs stay greppable.

use crate::cli::check_env::VarStatus;
use crate::cli::show_metadata::DocumentOverview;
use owo_colors::OwoColorize;

/// Width the field labels are padded to.
const LABEL_WIDTH: usize = 11;

/// Outcome shown in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Ok,
    Info,
    Warn,
    Fail,
}

impl Mark {
    fn tag(self) -> &'static str {
        match self {
            Mark::Ok => "[OK]",
            Mark::Info => "[INFO]",
            Mark::Warn => "[WARN]",
            Mark::Fail => "[FAIL]",
        }
    }
}

pub struct Output {
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Startup banner for `serve`.
    pub fn banner(&self, persona: &str) {
        let version = env!("CARGO_PKG_VERSION");
        if self.colored {
            println!(
                "\n  {} {}  {}\n",
                "Gemelo".bright_cyan().bold(),
                format!("v{version}").dimmed(),
                format!("digital twin of {persona}").bright_white(),
            );
        } else {
            println!("\n  Gemelo v{version}  digital twin of {persona}\n");
        }
    }

    /// One status line, without printing it.
    pub fn render(&self, mark: Mark, message: &str) -> String {
        if !self.colored {
            return format!("  {} {}", mark.tag(), message);
        }
        match mark {
            Mark::Ok => format!("  {} {}", "✓".green().bold(), message.green()),
            Mark::Info => format!("  {} {}", "•".blue(), message),
            Mark::Warn => format!("  {} {}", "!".yellow().bold(), message.yellow()),
            Mark::Fail => format!("  {} {}", "✗".red().bold(), message.red()),
        }
    }

    /// Prints a status line. Failures go to stderr.
    pub fn emit(&self, mark: Mark, message: &str) {
        let line = self.render(mark, message);
        if mark == Mark::Fail {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    pub fn ok(&self, message: &str) {
        self.emit(Mark::Ok, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Mark::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Mark::Warn, message);
    }

    pub fn fail(&self, message: &str) {
        self.emit(Mark::Fail, message);
    }

    /// Numbered stage of `init-data`, e.g. `[1/2] Waiting for the vector store`.
    pub fn stage(&self, current: u32, total: u32, message: &str) {
        let counter = format!("[{current}/{total}]");
        if self.colored {
            println!("  {} {}", counter.dimmed(), message.bright_white());
        } else {
            println!("  {counter} {message}");
        }
    }

    pub fn section(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  == {title} ==");
        }
    }

    /// Indented `label  value` line.
    pub fn field(&self, label: &str, value: &str) {
        let label = format!("{label:<LABEL_WIDTH$}");
        if self.colored {
            println!("    {} {}", label.dimmed(), value);
        } else {
            println!("    {label} {value}");
        }
    }

    /// One variable of the `check-env` report. A missing optional variable is
    /// informational; a missing required one is a failure.
    pub fn variable(&self, name: &str, description: &str, status: &VarStatus, required: bool) {
        let (mark, message) = variable_line(name, description, status, required);
        self.emit(mark, &message);
    }

    /// One stored document in the `show-metadata` listing.
    pub fn document(&self, doc: &DocumentOverview) {
        if self.colored {
            println!("\n  {}", doc.file_name.cyan().bold());
        } else {
            println!("\n  -- {} --", doc.file_name);
        }
        self.field("type", &doc.document_type);
        self.field("chunks", &doc.chunk_count.to_string());
        self.field("summary", &doc.document_summary);
        self.field("sample", &doc.sample_text);
    }

    /// Closing line of a command that succeeded.
    pub fn finished(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "✓".bright_green().bold(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {message}");
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("  {}", message.dimmed().italic());
        } else {
            println!("  [HINT] {message}");
        }
    }

    pub fn blank(&self) {
        println!();
    }
}

fn variable_line(
    name: &str,
    description: &str,
    status: &VarStatus,
    required: bool,
) -> (Mark, String) {
    match status {
        VarStatus::Set => (Mark::Ok, format!("{name}: set ({description})")),
        VarStatus::Invalid(reason) => (
            Mark::Warn,
            format!("{name}: set but {reason} ({description})"),
        ),
        VarStatus::Missing if required => (Mark::Fail, format!("{name}: NOT SET ({description})")),
        VarStatus::Missing => (Mark::Info, format!("{name}: not set ({description})")),
    }
}
