use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{ChatCompletionClient, LocalRefiner, RefineConfig, RefineError, Result};

/// Capability shared by the remote client and the local stand-in.
#[async_trait]
pub trait TextRefiner: Send + Sync {
    /// Short label used in logs and health output.
    fn name(&self) -> &'static str;

    /// Returns a professionally rephrased version of `input`.
    ///
    /// Fails with [`RefineError::InvalidInput`] when `input` is blank.
    async fn refine_text(&self, input: &str) -> Result<String>;
}

/// Picks the refiner once at startup.
///
/// Configured credentials select [`ChatCompletionClient`], wired so that
/// `shutdown` interrupts pending backoff sleeps. Otherwise the
/// [`LocalRefiner`] is used.
pub fn select_refiner(
    config: &RefineConfig,
    shutdown: CancellationToken,
) -> Result<Arc<dyn TextRefiner>> {
    match &config.api {
        Some(credentials) => {
            let client =
                ChatCompletionClient::from_config(config, credentials)?.with_cancellation(shutdown);
            Ok(Arc::new(client))
        }
        None => Ok(Arc::new(LocalRefiner::new())),
    }
}

/// Trims `input`, rejecting text that is empty afterwards.
pub(crate) fn require_text(input: &str) -> Result<&str> {
    let text = input.trim();
    if text.is_empty() {
        return Err(RefineError::InvalidInput(
            "Input text cannot be empty".to_owned(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::{require_text, select_refiner};
    use crate::{ApiCredentials, RefineConfig, RefineError};

    #[test]
    fn require_text_trims() {
        assert_eq!(require_text("  hi \n").expect("must accept"), "hi");
        assert!(matches!(
            require_text(" \t"),
            Err(RefineError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_credentials_select_local() {
        let refiner = select_refiner(&RefineConfig::default(), CancellationToken::new())
            .expect("must select");
        assert_eq!(refiner.name(), "local");
    }

    #[test]
    fn credentials_select_chat_completion() {
        let config = RefineConfig {
            api: Some(ApiCredentials {
                api_url: "https://api.example/v1/chat/completions".to_owned(),
                api_key: "key".to_owned(),
            }),
            ..RefineConfig::default()
        };
        let refiner = select_refiner(&config, CancellationToken::new()).expect("must select");
        assert_eq!(refiner.name(), "chat-completion");
    }
}
