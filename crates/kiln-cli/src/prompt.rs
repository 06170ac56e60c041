//! Interactive yes/no questions on the terminal.

use std::io::IsTerminal;
use std::sync::Arc;

use async_trait::async_trait;
use console::Term;
use indicatif::ProgressBar;
use kiln_config::{AlwaysConfirm, ConfigError, Decision, Question};
use tokio::sync::Mutex;

/// Asks questions on stderr and reads the answer from the terminal.
///
/// Questions from concurrently building entrypoints are asked one at a time.
/// When stdin is not a terminal every question is answered "no".
#[derive(Default)]
pub struct TerminalPrompt {
    turn: Mutex<()>,
    spinner: Option<ProgressBar>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide `spinner` while a question is on screen.
    pub fn with_spinner(mut self, spinner: ProgressBar) -> Self {
        self.spinner = Some(spinner);
        self
    }
}

#[async_trait]
impl Decision for TerminalPrompt {
    async fn confirm(&self, question: &Question) -> kiln_config::Result<bool> {
        let _turn = self.turn.lock().await;

        if !std::io::stdin().is_terminal() {
            tracing::warn!("not running in a terminal, answering no to: {question}");
            return Ok(false);
        }

        let text = question.to_string();
        let spinner = self.spinner.clone();
        tokio::task::spawn_blocking(move || match spinner {
            Some(bar) => bar.suspend(|| ask(&text)),
            None => ask(&text),
        })
        .await
        .map_err(|e| ConfigError::Decision(e.to_string()))?
    }
}

fn ask(text: &str) -> kiln_config::Result<bool> {
    let term = Term::stderr();
    loop {
        term.write_str(&format!("? {text} [y/N] "))
            .map_err(|e| ConfigError::Decision(e.to_string()))?;
        let line = term
            .read_line()
            .map_err(|e| ConfigError::Decision(e.to_string()))?;
        if let Some(answer) = parse_answer(&line) {
            return Ok(answer);
        }
        term.write_line("Please answer y or n.")
            .map_err(|e| ConfigError::Decision(e.to_string()))?;
    }
}

/// Empty input takes the default (no).
fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Decision implementation for the current invocation.
pub fn decision(yes: bool, spinner: Option<ProgressBar>) -> Arc<dyn Decision> {
    if yes {
        return Arc::new(AlwaysConfirm);
    }
    let prompt = TerminalPrompt::new();
    Arc::new(match spinner {
        Some(bar) => prompt.with_spinner(bar),
        None => prompt,
    })
}
