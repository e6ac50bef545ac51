//! Prompt templates for Rapport.
//!
//! Prompts can be customized by placing a `rag.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Built-in variables overlaid with those from config.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            rag: RagPrompts::default(),
            variables: default_variables(),
        }
    }
}

/// Variables every directive template relies on.
pub fn default_variables() -> HashMap<String, String> {
    HashMap::from([
        ("language".to_string(), "French".to_string()),
        ("domain".to_string(), "the indexed documents".to_string()),
    ])
}

/// Prompts for RAG answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// System directive sent at position 0.
    pub system: String,
    /// Answer returned when retrieval finds nothing.
    pub no_context: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert assistant who writes detailed reports from the documents of {{domain}}.

Guidelines:
- Always answer in {{language}}, with a professional tone and fluent prose
- Build the answer from the excerpts provided with each question; integrate them, do not copy them verbatim
- Structure longer answers as an introduction, a development with detailed explanations, and a conclusion
- Take earlier questions of the conversation into account for follow-ups
- If the question is outside the scope of {{domain}}, or the excerpts do not support an answer, say so politely instead of inventing one
- You may extrapolate beyond the excerpts when it helps the reader, but state explicitly which parts are extrapolation"#
                .to_string(),

            no_context: "No relevant result was found in the indexed documents for this question."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts
                .variables
                .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// The system directive with config variables substituted.
    pub fn system_directive(&self) -> String {
        Self::render(&self.rag.system, &self.variables)
    }

    /// The short-circuit answer with config variables substituted.
    pub fn no_context_answer(&self) -> String {
        Self::render(&self.rag.no_context, &self.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.rag.system.is_empty());
        assert!(!prompts.rag.no_context.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_system_directive_uses_variables() {
        let mut vars = HashMap::new();
        vars.insert("language".to_string(), "French".to_string());
        vars.insert("domain".to_string(), "maritime law".to_string());

        let prompts = Prompts::load(None, Some(&vars)).unwrap();
        let directive = prompts.system_directive();
        assert!(directive.contains("answer in French"));
        assert!(directive.contains("maritime law"));
        assert!(!directive.contains("{{"));
    }

    #[test]
    fn test_partial_variables_keep_defaults() {
        let settings: crate::config::Settings =
            toml::from_str("[prompts.variables]\ndomain = \"maritime law\"\n").unwrap();

        let prompts = Prompts::load(None, Some(&settings.prompts.variables)).unwrap();
        let directive = prompts.system_directive();
        assert!(directive.contains("maritime law"));
        assert!(directive.contains("answer in French"));
        assert!(!directive.contains("{{"));
    }

    #[test]
    fn test_default_prompts_render_without_placeholders() {
        assert!(!Prompts::default().system_directive().contains("{{"));
    }

    #[test]
    fn test_custom_rag_prompts_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "no_context = \"Rien trouvé.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.no_context_answer(), "Rien trouvé.");
        // Unset keys keep their defaults.
        assert_eq!(prompts.rag.system, RagPrompts::default().system);
    }
}
