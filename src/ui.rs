use colored::*;
use terminal_size::{Width, Height, terminal_size};

pub fn print_header(subtitle: &str) {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    let width = (width.0 as usize).min(100);

    let line = "─".repeat(width);
    println!("{}", line.black().bold());

    let name = "SCOPE auth".cyan().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}  {}", name, version, subtitle);

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_field(label: &str, value: &str) {
    println!("  {:<18} {}", format!("{}:", label).dimmed(), value);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "!".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}
