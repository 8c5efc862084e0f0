use async_trait::async_trait;
use std::io::Write;

/// Yes/no confirmation surface the orchestrator blocks on when a prompt
/// flag is set. A "no" answer surfaces as a user abort, distinguishable
/// from ordinary execution errors.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, question: &str) -> bool;
}

/// Interactive prompt on stdin/stdout
pub struct StdinPrompt;

#[async_trait]
impl ConfirmPrompt for StdinPrompt {
    async fn confirm(&self, question: &str) -> bool {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            print!("{} [y/N]: ", question);
            let _ = std::io::stdout().flush();
            let mut answer = String::new();
            if std::io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

/// Non-interactive prompt with a fixed answer, used for unattended runs
/// and tests
pub struct FixedPrompt(pub bool);

#[async_trait]
impl ConfirmPrompt for FixedPrompt {
    async fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}
