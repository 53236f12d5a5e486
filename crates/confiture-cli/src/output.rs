//! Output helpers for consistent, confiture-specific formatting, in the
//! same spirit as the teacher's `cli/src/output.rs`.

use colored::Colorize;

pub fn heading(text: &str) -> String {
    text.bright_cyan().to_string()
}

pub fn label(text: &str) -> String {
    text.bright_blue().to_string()
}

pub fn muted(text: &str) -> String {
    text.bright_black().to_string()
}

pub fn success(text: &str) -> String {
    text.bright_green().to_string()
}

pub fn warning(text: &str) -> String {
    text.yellow().to_string()
}

pub fn error(text: &str) -> String {
    text.red().to_string()
}

pub fn status_ok() -> String {
    "OK".green().to_string()
}

pub fn status_error() -> String {
    "ERROR".red().to_string()
}

pub fn banner_error(text: &str) -> String {
    format!("{} {}", " Error ".white().on_red().bold(), text)
}
