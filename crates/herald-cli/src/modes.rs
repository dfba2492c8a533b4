//! View / approve / direct publishing modes.

use std::future::Future;

use clap::ValueEnum;
use herald_core::{HeraldError, PostReceipt, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Generate and print, never publish
    View,
    /// Generate, print, publish only after confirmation
    Approve,
    /// Publish text typed by the user, no generation
    Direct,
}

impl Mode {
    /// Accepts "1".."3", a mode name, or a full menu line such as "2. Approve ..."
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        let choice = choice.trim().to_lowercase();
        let key = choice
            .split(|c: char| c == '.' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        match key {
            "1" | "view" => Some(Mode::View),
            "2" | "approve" => Some(Mode::Approve),
            "3" | "direct" => Some(Mode::Direct),
            _ => None,
        }
    }
}

/// Text to publish: typed by the user in direct mode, generated from a topic otherwise
pub async fn compose<A, G, Fut>(mode: Mode, topic_question: &str, ask: A, generate: G) -> Result<String>
where
    A: FnOnce(&str) -> Result<String>,
    G: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    match mode {
        Mode::Direct => {
            let text = ask("Enter the text to publish:")?;
            let text = text.trim();
            if text.is_empty() {
                return Err(HeraldError::Validation("Post text cannot be empty".to_string()));
            }
            Ok(text.to_string())
        }
        Mode::View | Mode::Approve => {
            let topic = ask(topic_question)?;
            generate(topic).await
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Shown,
    Declined,
    Published(PostReceipt),
}

/// Drive one piece of content through `mode`
pub async fn run_mode<A, P, Fut>(mode: Mode, preview: &str, approve: A, publish: P) -> Result<Outcome>
where
    A: FnOnce(&str) -> Result<bool>,
    P: FnOnce() -> Fut,
    Fut: Future<Output = Result<PostReceipt>>,
{
    println!("\n--- Content ---\n{}\n---------------", preview);

    match mode {
        Mode::View => Ok(Outcome::Shown),
        Mode::Approve => {
            if approve(preview)? {
                Ok(Outcome::Published(publish().await?))
            } else {
                Ok(Outcome::Declined)
            }
        }
        Mode::Direct => Ok(Outcome::Published(publish().await?)),
    }
}

pub fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Shown => println!("Content not published (view mode)."),
        Outcome::Declined => println!("Content not approved; nothing was published."),
        Outcome::Published(receipt) => match &receipt.url {
            Some(url) => println!("Published to {}: {}", receipt.platform, url),
            None => println!("Published to {} (id {})", receipt.platform, receipt.id),
        },
    }
}
