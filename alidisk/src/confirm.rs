//! Yes/no confirmation for overwriting moves and copies.

use std::fmt;
use std::sync::Arc;

use dialoguer::theme::Theme;

pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Asks on the terminal. Enter, `n` or a failed prompt answer no.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        dialoguer::Confirm::with_theme(&NoYesTheme)
            .with_prompt(prompt)
            .default(false)
            .wait_for_newline(true)
            .interact()
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "confirmation aborted");
                false
            })
    }
}

/// Renders confirmations as `<prompt> [No/yes] `.
struct NoYesTheme;

impl Theme for NoYesTheme {
    fn format_confirm_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<bool>,
    ) -> fmt::Result {
        write!(f, "{prompt} [No/yes] ")
    }
}

/// A preset answer, used where no one can be asked.
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, answer = self.0, "answering confirmation");
        self.0
    }
}

/// Asks on a blocking thread so a waiting prompt holds no runtime worker.
pub async fn ask(confirm: &Arc<dyn Confirm>, prompt: &'static str) -> bool {
    let confirm = Arc::clone(confirm);
    tokio::task::spawn_blocking(move || confirm.confirm(prompt))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_offers_no_first() {
        let mut rendered = String::new();
        NoYesTheme
            .format_confirm_prompt(&mut rendered, "Target name exist, overwrite or not:", Some(false))
            .unwrap();
        assert_eq!(rendered, "Target name exist, overwrite or not: [No/yes] ");
    }

    #[tokio::test]
    async fn ask_returns_the_answer() {
        let yes: Arc<dyn Confirm> = Arc::new(FixedAnswer(true));
        let no: Arc<dyn Confirm> = Arc::new(FixedAnswer(false));
        assert!(ask(&yes, "overwrite?").await);
        assert!(!ask(&no, "overwrite?").await);
    }
}
