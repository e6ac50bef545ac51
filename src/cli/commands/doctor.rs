//! Doctor command - verify artifacts, dimensions and API keys.

use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings};
use crate::passages::PassageStore;
use crate::vector_index::{load_sqlite, FlatIndex, VectorIndex};
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Rapport Doctor");
    println!();
    println!("Checking configuration, artifacts and API keys...\n");

    let mut checks = Vec::new();

    println!("{}", style("Configuration").bold());
    let section = vec![check_config_file(config_path), check_settings(settings)];
    print_section(&section);
    checks.extend(section);

    println!("{}", style("API Keys").bold());
    let mut section = vec![check_api_key("Generation", &settings.generation.api_key_env)];
    if settings.embedding.provider == EmbeddingProvider::OpenAI {
        section.push(check_api_key("Embedding", &settings.embedding.api_key_env));
    }
    print_section(&section);
    checks.extend(section);

    println!("{}", style("Artifacts").bold());
    let section = check_artifacts(settings);
    print_section(&section);
    checks.extend(section);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Rapport.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Rapport is ready to answer questions.");
    }

    Ok(())
}

fn print_section(checks: &[CheckResult]) {
    for check in checks {
        check.print();
    }
    println!();
}

/// Check if the config file in effect exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: rapport config edit",
        )
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "top_k {}, model {}, {} embedder",
                settings.retrieval.top_k, settings.generation.model, settings.embedding.provider
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix with: rapport config edit"),
    }
}

/// Check that an API key environment variable is set.
fn check_api_key(label: &str, var: &str) -> CheckResult {
    let name = format!("{} ({})", label, var);
    match std::env::var(var) {
        Ok(key) if key.trim().is_empty() => CheckResult::error(
            &name,
            "empty",
            &format!("Set with: export {}='...'", var),
        ),
        Ok(key) => CheckResult::ok(&name, &format!("configured ({})", mask_key(&key))),
        Err(_) => CheckResult::error(
            &name,
            "not set",
            &format!("Set with: export {}='...'", var),
        ),
    }
}

/// Check that the index and passage artifacts load and agree.
fn check_artifacts(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let index_path = settings.index_path();
    let index = match load_sqlite(&index_path) {
        Ok(index) => {
            results.push(CheckResult::ok(
                "Vector index",
                &format!(
                    "{} ({} vectors, {} dimensions, {}, {})",
                    index_path.display(),
                    index.len(),
                    index.dimensions(),
                    index.metric(),
                    file_size(&index_path)
                ),
            ));
            Some(index)
        }
        Err(e) => {
            results.push(CheckResult::error(
                "Vector index",
                &e.to_string(),
                "Build the index with the indexer, or set index.path",
            ));
            None
        }
    };

    let passages_path = settings.passages_path();
    let passages = match PassageStore::load(&passages_path) {
        Ok(store) => {
            results.push(CheckResult::ok(
                "Passages",
                &format!(
                    "{} ({} passages, {})",
                    passages_path.display(),
                    store.len(),
                    file_size(&passages_path)
                ),
            ));
            Some(store)
        }
        Err(e) => {
            results.push(CheckResult::error(
                "Passages",
                &e.to_string(),
                "Build the passages with the indexer, or set passages.path",
            ));
            None
        }
    };

    if let (Some(index), Some(passages)) = (&index, &passages) {
        results.push(match passages.validate_against(index) {
            Ok(()) => CheckResult::ok("Artifact pairing", "index and passages match"),
            Err(e) => CheckResult::error(
                "Artifact pairing",
                &e.to_string(),
                "Rebuild both artifacts in the same run",
            ),
        });
    }

    if let Some(index) = &index {
        results.push(check_dimensions(settings, index));
    }

    results
}

fn check_dimensions(settings: &Settings, index: &FlatIndex) -> CheckResult {
    let configured = settings.embedding.dimensions as usize;
    if configured == index.dimensions() {
        CheckResult::ok(
            "Embedding dimensions",
            &format!("{} matches the index", configured),
        )
    } else {
        CheckResult::error(
            "Embedding dimensions",
            &format!(
                "embedder produces {} but the index holds {}",
                configured,
                index.dimensions()
            ),
            "Set embedding.dimensions (and model) to what the index was built with",
        )
    }
}

/// Show only the ends of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn file_size(path: &Path) -> String {
    std::fs::metadata(path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string())
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
