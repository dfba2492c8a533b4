//! Terminal prompts built on inquire.

use herald_core::auth::VerifierPrompt;
use herald_core::{HeraldError, Result};
use inquire::{Confirm, InquireError, Select, Text};

use crate::modes::Mode;

const MENU: [&str; 3] = [
    "1. View generated content",
    "2. Approve content before posting",
    "3. Post content directly",
];

/// Numbered mode menu shown when `--mode` is omitted
pub fn choose_mode() -> Result<Mode> {
    let choice = Select::new("Choose a mode:", MENU.to_vec())
        .prompt()
        .map_err(prompt_error)?;
    Mode::from_menu_choice(choice)
        .ok_or_else(|| HeraldError::Validation(format!("Invalid menu choice '{}'", choice)))
}

/// Free-text query for the generator
pub fn ask_query(label: &str) -> Result<String> {
    Text::new(label).prompt().map_err(prompt_error)
}

pub fn confirm(question: &str) -> Result<bool> {
    Confirm::new(question)
        .with_default(false)
        .prompt()
        .map_err(prompt_error)
}

/// Shows the consent URL and reads back the PIN or code the provider displays
pub struct TerminalVerifier;

impl VerifierPrompt for TerminalVerifier {
    fn prompt(&self, authorize_url: &str, message: &str) -> Result<String> {
        println!("\nOpen this URL in your browser and authorize Herald:\n  {}\n", authorize_url);
        let value = Text::new(message).prompt().map_err(prompt_error)?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(HeraldError::Validation("No value entered".to_string()));
        }
        Ok(value)
    }
}

fn prompt_error(e: InquireError) -> HeraldError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            HeraldError::Validation("Cancelled".to_string())
        }
        other => HeraldError::Config(format!("Terminal prompt failed: {}", other)),
    }
}
