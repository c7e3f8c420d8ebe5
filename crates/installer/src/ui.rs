//! UI helpers for the installer CLI.
//!
//! Provides consistent formatting for console output during installation.

use colored::Colorize;

use crate::step::{StepOutcome, StepResult};

/// Print the installer banner.
pub fn print_banner() {
    println!();
    println!("{}", "  Wiki Family Installer".cyan().bold());
    println!(
        "  {}",
        "Per-wiki setup for centrally managed wiki families".bright_black()
    );
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!();
}

/// Print a progress step with step number.
pub fn print_progress_step(current: usize, total: usize, name: &str) {
    println!(
        "{} {} {}",
        format!("[{current}/{total}]").bright_black(),
        "▶".cyan(),
        name.bold()
    );
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {} {}", format!("{key}:").bright_black(), value.green());
}

/// Print an environment check result.
pub fn print_check_result(name: &str, passed: bool, message: Option<&str>) {
    let status = if passed { "✓".green() } else { "✗".red() };

    let text = if let Some(msg) = message {
        format!("{name} - {msg}")
    } else {
        name.to_string()
    };

    println!("  {status} {text}");
}

/// Print a step removed by the skip policy.
pub fn print_skipped(name: &str) {
    println!("  {} {}", "–".bright_black(), format!("{name} (skipped)").bright_black());
}

/// Print the recorded result of one step.
pub fn print_step_result(result: &StepResult) {
    match &result.outcome {
        StepOutcome::Ok => println!("  {} {}", "✓".green(), result.step_name),
        StepOutcome::Warning(message) => println!(
            "  {} {} - {}",
            "⚠".yellow(),
            result.step_name.yellow(),
            message.bright_black()
        ),
        StepOutcome::Fatal(message) => println!(
            "  {} {} - {}",
            "✗".red(),
            result.step_name.red(),
            message
        ),
    }
}
