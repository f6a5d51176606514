use owo_colors::OwoColorize;

pub fn success(label: &str) {
    println!("{} {}", "✓".green(), label.green());
}

pub fn error(label: &str) {
    eprintln!("{} {}", "✗".red(), label.red());
}

pub fn warn(label: &str) {
    eprintln!("{} {}", "!".yellow(), label.yellow());
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", "ℹ".cyan(), label.dimmed(), value);
}
