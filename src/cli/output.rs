//! CLI output formatting utilities.

use crate::orchestrator::ReplyKind;
use crate::rag::RetrievedPassage;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an answer, dimmed when it reports a failure.
    pub fn answer(text: &str, kind: ReplyKind) {
        match kind {
            ReplyKind::Answer => println!("\n{}\n", text),
            ReplyKind::NoContext => println!("\n{}\n", style(text).yellow()),
            _ => println!("\n{}\n", style(text).red()),
        }
    }

    /// Print a retrieved passage with its rank, distance and provenance.
    pub fn passage(rank: usize, passage: &RetrievedPassage, preview_len: usize) {
        println!(
            "\n{} {} (distance: {:.4})",
            style(format!("[{}]", rank)).green(),
            style(&passage.chunk.source).bold(),
            passage.distance
        );
        println!("   {}", content_preview(&passage.chunk.text, preview_len));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten newlines and truncate with ellipsis on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
