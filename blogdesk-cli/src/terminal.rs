//! [`EditorUi`] on a terminal.

use async_trait::async_trait;
use blogdesk_sync::EditorUi;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Prints errors to stderr and asks confirmations on stdin.
#[derive(Debug, Clone, Default)]
pub struct TerminalUi {
    /// Answer every confirmation with yes.
    pub assume_yes: bool,
}

impl TerminalUi {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

/// Accepts `y` and `yes` in any case.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl EditorUi for TerminalUi {
    async fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{message} [y/N] ");
        if let Err(e) = std::io::stdout().flush() {
            warn!("Failed to flush prompt: {}", e);
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(e) => {
                warn!("Failed to read answer: {}", e);
                false
            }
        }
    }

    async fn navigate_back(&self) {
        debug!("Editor closed");
    }
}
