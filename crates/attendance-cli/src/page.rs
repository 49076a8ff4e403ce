//! Terminal rendering of the registration page.

use anyhow::{Context, Result};
use attendance_core::message::{event_heading, PAGE_SUBTITLE, PAGE_TITLE};
use attendance_core::{Notice, Severity};
use colored::Colorize;
use std::io::{self, BufRead, Write};

pub fn header() {
    println!("{}", PAGE_TITLE.cyan().bold());
    println!("{}", PAGE_SUBTITLE.dimmed());
    println!("{}", "═".repeat(40).dimmed());
}

pub fn event(name: &str) {
    println!();
    println!("{}", event_heading(name).bold());
}

pub fn notice(notice: &Notice) {
    let line = match notice.severity {
        Severity::Error => notice.text.red(),
        Severity::Warning => notice.text.yellow(),
        Severity::Success => notice.text.green().bold(),
    };
    println!("{line}");
}

/// Prompt for a display name. `None` once stdin is exhausted.
pub fn prompt_name(input: &mut impl BufRead) -> Result<Option<String>> {
    print!("{} ", "Enter your name:".bold());
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read name")?;
    if read == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
