//! Human-readable console output helpers. Colour is only emitted when
//! stdout is a terminal, matching the teacher's `IsTerminal`-gated approach.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

fn colour_enabled() -> bool {
    std::io::stdout().is_terminal()
}

pub fn header(text: &str) {
    if colour_enabled() {
        println!("{}", text.bold());
    } else {
        println!("{text}");
    }
}

pub fn section(text: &str) {
    if colour_enabled() {
        println!("\n{}", text.bold().underline());
    } else {
        println!("\n{text}");
    }
}

pub fn field(key: &str, value: impl std::fmt::Display) {
    if colour_enabled() {
        println!("  {}: {}", key.dimmed(), value);
    } else {
        println!("  {key}: {value}");
    }
}

pub fn success(text: &str) {
    if colour_enabled() {
        println!("{} {}", "✓".green().bold(), text);
    } else {
        println!("[ok] {text}");
    }
}

pub fn warning(text: &str) {
    if colour_enabled() {
        println!("{} {}", "!".yellow().bold(), text);
    } else {
        println!("[warn] {text}");
    }
}

pub fn error(text: &str) {
    if colour_enabled() {
        eprintln!("{} {}", "✗".red().bold(), text);
    } else {
        eprintln!("[error] {text}");
    }
}

pub fn info(text: &str) {
    if colour_enabled() {
        println!("{}", text.cyan());
    } else {
        println!("{text}");
    }
}
