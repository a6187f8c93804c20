use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    refiner::{require_text, TextRefiner},
    Result,
};

/// Artificial latency that emulates a network round trip.
pub const DEFAULT_LOCAL_DELAY: Duration = Duration::from_millis(500);

const ACKNOWLEDGMENT: &str = "I understand your concern.";
const CONCERN_KEYWORDS: [&str; 4] = ["sorry", "apologize", "issue", "problem"];

/// Deterministic stand-in used when no API credential is configured.
///
/// Never touches the network: trims the text, capitalizes it, makes sure it
/// ends with punctuation and prepends an acknowledgment when the text reads
/// like an apology or a complaint.
#[derive(Clone, Debug)]
pub struct LocalRefiner {
    delay: Duration,
}

impl Default for LocalRefiner {
    fn default() -> Self {
        Self {
            delay: DEFAULT_LOCAL_DELAY,
        }
    }
}

impl LocalRefiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TextRefiner for LocalRefiner {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn refine_text(&self, input: &str) -> Result<String> {
        let text = require_text(input)?;
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        Ok(polish(text))
    }
}

fn polish(text: &str) -> String {
    let mut polished = capitalize_first(text);
    if !polished.ends_with(&['.', '!', '?'][..]) {
        polished.push('.');
    }

    let lower = text.to_lowercase();
    if CONCERN_KEYWORDS.iter().any(|keyword| lower.contains(*keyword)) {
        polished = format!("{ACKNOWLEDGMENT} {polished}");
    }
    polished
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{polish, LocalRefiner};
    use crate::{RefineError, TextRefiner};

    fn refiner() -> LocalRefiner {
        LocalRefiner::new().with_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn plain_text_is_capitalized_and_punctuated() {
        let input = "this is a test message";
        let output = refiner().refine_text(input).await.expect("must refine");
        assert_eq!(output, "This is a test message.");
        assert_ne!(output, input);
    }

    #[tokio::test]
    async fn apology_gets_acknowledgment() {
        let output = refiner()
            .refine_text("sorry for the issue")
            .await
            .expect("must refine");
        assert_eq!(output, "I understand your concern. Sorry for the issue.");
    }

    #[tokio::test]
    async fn keywords_match_case_insensitively() {
        let output = refiner()
            .refine_text("We have a PROBLEM!")
            .await
            .expect("must refine");
        assert_eq!(output, "I understand your concern. We have a PROBLEM!");
    }

    #[tokio::test]
    async fn meaning_is_preserved() {
        let output = refiner()
            .refine_text("The system is down")
            .await
            .expect("must refine");
        assert!(output.contains("system"));
        assert!(output.contains("down"));
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        for input in ["", "   ", "\n\t"] {
            let err = refiner()
                .refine_text(input)
                .await
                .expect_err("blank input must fail");
            assert!(matches!(err, RefineError::InvalidInput(_)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_refiner_emulates_latency() {
        let started = tokio::time::Instant::now();
        LocalRefiner::new()
            .refine_text("hello")
            .await
            .expect("must refine");
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn existing_punctuation_is_kept() {
        assert_eq!(polish("is it fixed?"), "Is it fixed?");
        assert_eq!(polish("éclair time"), "Éclair time.");
    }
}
