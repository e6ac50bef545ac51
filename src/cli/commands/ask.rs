//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command: one question in a fresh session.
pub async fn run_ask(
    question: &str,
    top_k: Option<usize>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'rapport doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    super::apply_overrides(&mut settings, top_k, model);

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let mut session = orchestrator.session();

    let spinner = Output::spinner("Searching indexed documents...");
    let reply = session.submit(question).await;
    spinner.finish_and_clear();

    Output::answer(&reply.answer, reply.kind);

    if !reply.sources.is_empty() {
        Output::header("Sources");
        for (rank, source) in reply.sources.iter().enumerate() {
            Output::passage(rank + 1, source, 100);
        }
        println!();
    }

    Ok(())
}
