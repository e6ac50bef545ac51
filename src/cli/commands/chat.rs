//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, Session};
use crate::rag::{Role, Turn};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Exit,
    Clear,
    History,
    Question(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        ChatInput::Empty
    } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        ChatInput::Exit
    } else if line.eq_ignore_ascii_case("clear") {
        ChatInput::Clear
    } else if line.eq_ignore_ascii_case("history") {
        ChatInput::History
    } else {
        ChatInput::Question(line)
    }
}

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'rapport doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    super::apply_overrides(&mut settings, None, model);

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let mut session = orchestrator.session();

    println!("\n{}", style("Rapport Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, 'history' to review, 'clear' to start over, 'exit' to quit.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::Clear => {
                session = orchestrator.session();
                Output::info("Conversation history cleared.");
            }
            ChatInput::History => print_history(&session),
            ChatInput::Question(question) => {
                let spinner = Output::spinner("Thinking...");
                let reply = session.submit(question).await;
                spinner.finish_and_clear();

                print!("{}", style("Rapport:").cyan().bold());
                Output::answer(&reply.answer, reply.kind);
            }
        }
    }

    Ok(())
}

fn print_history(session: &Session) {
    let turns = session.history();
    if turns.is_empty() {
        Output::info("No conversation yet.");
        return;
    }

    Output::header(&format!("History ({} turns)", turns.len()));
    for turn in turns {
        println!("{}", format_turn(turn));
    }
    println!();
}

fn format_turn(turn: &Turn) -> String {
    let label = match turn.role {
        Role::User => style("you").green().bold(),
        Role::Assistant => style("rapport").cyan().bold(),
        Role::System => style("system").dim(),
    };
    format!("  {}: {}", label, turn.content)
}
