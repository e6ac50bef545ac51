//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command: retrieval only, no generation.
pub async fn run_search(query: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    settings.validate()?;
    let retriever = Orchestrator::load_retriever(&settings)?;
    let k = top_k.unwrap_or(settings.retrieval.top_k);

    let spinner = Output::spinner("Searching...");
    let results = retriever.search(query, k).await;
    spinner.finish_and_clear();

    match results {
        Ok(passages) => {
            if passages.is_empty() {
                Output::warning("No passages found for this query.");
            } else {
                Output::success(&format!("Found {} passages", passages.len()));

                for (rank, passage) in passages.iter().enumerate() {
                    Output::passage(rank + 1, passage, 200);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
