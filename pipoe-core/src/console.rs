use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

fn dim(text: &str) -> String {
    paint("2", text)
}

fn cyan(text: &str) -> String {
    paint("36", text)
}

fn yellow(text: &str) -> String {
    paint("33", text)
}

fn red(text: &str) -> String {
    paint("31", text)
}

pub fn header(command: &str, version: &str) {
    START_TIME.get_or_init(Instant::now);
    eprintln!("{}", dim(&format!("pipoe {} v{}", command, version)));
    eprintln!();
}

pub fn elapsed_secs() -> f32 {
    START_TIME
        .get()
        .map(|t| t.elapsed().as_secs_f32())
        .unwrap_or(0.0)
}

pub fn step(message: &str) {
    println!("{}", message);
}

pub fn step_with_count(message: &str, count: usize) {
    println!("{} {}", message, cyan(&format!("({})", count)));
}

/// Prefix drawn in front of a package at the given recursion depth.
pub fn tree_prefix(depth: usize) -> String {
    if depth == 0 {
        String::new()
    } else {
        format!("|{} ", "-".repeat((depth - 1) * 2))
    }
}

/// One line of the dependency trace, indented by recursion depth.
pub fn tree(depth: usize, label: &str) {
    println!("  {}{}", tree_prefix(depth), label);
    let _ = io::stdout().flush();
}

pub fn tree_warn(message: &str) {
    println!("  | {} {}", yellow("[WARNING]"), message);
}

pub fn tree_error(depth: usize, message: &str) {
    println!("  {} {} {}", tree_prefix(depth), red("[ERROR]"), message);
}

pub fn summary(recipes: usize, failures: usize, seconds: f32) {
    println!();
    let time_str = if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    };
    let noun = if recipes == 1 { "recipe" } else { "recipes" };
    let failed = if failures == 0 {
        String::new()
    } else {
        format!(", {} failed", failures)
    };
    println!(
        "{} {} generated{} {}",
        recipes,
        noun,
        failed,
        dim(&format!("[{}]", time_str))
    );
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn error(message: &str) {
    let tag = red("error");
    eprintln!("{} {}", tag, message);
}

pub fn info(message: &str) {
    println!("{}", message);
}

pub fn verbose(message: &str) {
    tracing::debug!("{}", message);
}
