//! Message sequence assembly for the generation call.

use super::conversation::Turn;

/// Build the ordered message list sent to the generator.
///
/// Layout is fixed: the directive (if any) as a system turn, then every
/// history turn unchanged, then one user turn carrying the retrieved context
/// followed by the question. Empty context yields a question-only user turn.
pub fn assemble(
    directive: Option<&str>,
    history: &[Turn],
    context: &[String],
    question: &str,
) -> Vec<Turn> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Some(directive) = directive {
        messages.push(Turn::system(directive));
    }

    messages.extend(history.iter().cloned());
    messages.push(Turn::user(user_content(context, question)));

    messages
}

/// Context passages one per line, a blank line, then the question.
pub fn user_content(context: &[String], question: &str) -> String {
    if context.is_empty() {
        return question.to_string();
    }

    format!("{}\n\n{}", context.join("\n"), question)
}
