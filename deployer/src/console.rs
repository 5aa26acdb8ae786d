//! Operator-facing progress lines

use std::path::Path;

use colored::Colorize;

/// Announce a flow step
pub fn step(message: &str) {
    println!("{} {}", "==>".cyan().bold(), message.bold());
}

/// Report a completed step
pub fn done(message: &str) {
    println!("    {} {}", "[OK]".green().bold(), message);
}

/// Report a degraded but non-fatal outcome
pub fn warn(message: &str) {
    println!("    {} {}", "[WARN]".yellow().bold(), message);
}

/// Report a fatal error together with where the logs are
pub fn fatal(message: &str, run_log: Option<&Path>, error_log: Option<&Path>) {
    eprintln!();
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
    for line in log_locations(run_log, error_log) {
        eprintln!("{}", line);
    }
}

/// Lines pointing the operator at this run's logs
pub fn log_locations(run_log: Option<&Path>, error_log: Option<&Path>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = run_log {
        lines.push(format!("  Run log:   {}", path.display()));
    }
    if let Some(path) = error_log {
        lines.push(format!("  Error log: {}", path.display()));
    }
    lines
}
