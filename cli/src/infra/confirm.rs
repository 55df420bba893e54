//! Interactive confirmation gate.

use anyhow::{Context, Result};

use crate::application::ports::ConfirmationGate;

/// Prompts on the terminal and compares the typed answer exactly against
/// the required phrase. Blocks with no timeout — destructive actions
/// require an explicit human answer.
pub struct StdinGate;

impl ConfirmationGate for StdinGate {
    fn confirm(&self, prompt: &str, required_phrase: &str) -> Result<bool> {
        println!("{prompt}");
        let answer: String = dialoguer::Input::new()
            .with_prompt(format!("Type '{required_phrase}' to confirm"))
            .allow_empty(true)
            .interact_text()
            .context("reading confirmation")?;
        Ok(answer.trim() == required_phrase)
    }
}
