use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{client::DEFAULT_MODEL, RefineError, Result, RetryPolicy, SystemPrompt};

pub const ENV_API_KEY: &str = "AI_API_KEY";
pub const ENV_API_URL: &str = "AI_API_URL";
pub const ENV_MODEL: &str = "AI_API_MODEL";
pub const ENV_SYSTEM_PROMPT: &str = "AI_API_PROMPT_SYSTEM";
pub const ENV_MAX_RETRIES: &str = "AI_API_RETRY_MAX_RETRIES";
pub const ENV_INITIAL_DELAY_MS: &str = "AI_API_RETRY_INITIAL_DELAY_MS";
pub const ENV_BACKOFF_MULTIPLIER: &str = "AI_API_RETRY_BACKOFF_MULTIPLIER";
pub const ENV_MAX_DELAY_MS: &str = "AI_API_RETRY_MAX_DELAY_MS";

/// Endpoint and key for the remote chat-completion API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_url: String,
    pub api_key: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Settings read once at startup.
///
/// `api` is `None` when no key is configured, which selects the local refiner.
#[derive(Clone, Debug, PartialEq)]
pub struct RefineConfig {
    pub api: Option<ApiCredentials>,
    pub model: String,
    pub system_prompt: SystemPrompt,
    pub retry: RetryPolicy,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            api: None,
            model: DEFAULT_MODEL.to_owned(),
            system_prompt: SystemPrompt::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl RefineConfig {
    /// Reads configuration from `AI_API_*` environment variables.
    ///
    /// - `AI_API_KEY` / `AI_API_URL`: both required for the remote client
    /// - `AI_API_MODEL`, `AI_API_PROMPT_SYSTEM`: optional overrides
    /// - `AI_API_RETRY_*`: retry count, initial delay, multiplier, delay cap
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RefineConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = RetryPolicy::default();

        let api = match non_blank(ENV_API_KEY) {
            Some(api_key) => {
                let api_url = non_blank(ENV_API_URL).ok_or_else(|| {
                    RefineError::Config(format!(
                        "{ENV_API_URL} must be configured when {ENV_API_KEY} is set"
                    ))
                })?;
                Some(ApiCredentials {
                    api_url: api_url.trim().to_owned(),
                    api_key: api_key.trim().to_owned(),
                })
            }
            None => None,
        };

        let max_retries = parse_or(&non_blank, ENV_MAX_RETRIES, defaults.max_retries())?;
        let initial_delay_ms = parse_or(
            &non_blank,
            ENV_INITIAL_DELAY_MS,
            defaults.initial_delay().as_millis() as u64,
        )?;
        let backoff_multiplier = parse_or(
            &non_blank,
            ENV_BACKOFF_MULTIPLIER,
            defaults.backoff_multiplier(),
        )?;
        let max_delay_ms = parse_or(
            &non_blank,
            ENV_MAX_DELAY_MS,
            defaults.max_delay().as_millis() as u64,
        )?;

        let retry = RetryPolicy::new(
            max_retries,
            Duration::from_millis(initial_delay_ms),
            backoff_multiplier,
            Duration::from_millis(max_delay_ms),
        )?;

        Ok(Self {
            api,
            model: non_blank(ENV_MODEL)
                .map(|model| model.trim().to_owned())
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            system_prompt: SystemPrompt::with_override(non_blank(ENV_SYSTEM_PROMPT).as_deref()),
            retry,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| RefineError::Config(format!("invalid {key} value '{raw}': {err}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::RefineConfig;
    use crate::{RefineError, RetryPolicy, SystemPrompt};

    fn load(vars: &[(&str, &str)]) -> crate::Result<RefineConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        RefineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).expect("defaults must load");
        assert_eq!(config, RefineConfig::default());
        assert!(config.api.is_none());
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn blank_key_falls_back_to_local() {
        let config = load(&[("AI_API_KEY", "  "), ("AI_API_URL", "https://x")])
            .expect("must load");
        assert!(config.api.is_none());
    }

    #[test]
    fn key_without_url_is_rejected() {
        let err = load(&[("AI_API_KEY", "gsk_1")]).expect_err("url is required");
        assert!(matches!(err, RefineError::Config(message) if message.contains("AI_API_URL")));
    }

    #[test]
    fn reads_all_overrides() {
        let config = load(&[
            ("AI_API_KEY", "gsk_1"),
            ("AI_API_URL", " https://api.example/v1/chat/completions "),
            ("AI_API_MODEL", "mixtral"),
            ("AI_API_PROMPT_SYSTEM", "Be brief."),
            ("AI_API_RETRY_MAX_RETRIES", "5"),
            ("AI_API_RETRY_INITIAL_DELAY_MS", "200"),
            ("AI_API_RETRY_BACKOFF_MULTIPLIER", "1.5"),
            ("AI_API_RETRY_MAX_DELAY_MS", "3000"),
        ])
        .expect("must load");

        let api = config.api.expect("credentials must be set");
        assert_eq!(api.api_url, "https://api.example/v1/chat/completions");
        assert_eq!(api.api_key, "gsk_1");
        assert_eq!(config.model, "mixtral");
        assert_eq!(config.system_prompt, SystemPrompt::with_override(Some("Be brief.")));
        assert_eq!(config.retry.max_retries(), 5);
        assert_eq!(config.retry.initial_delay(), Duration::from_millis(200));
        assert_eq!(config.retry.backoff_multiplier(), 1.5);
        assert_eq!(config.retry.max_delay(), Duration::from_millis(3_000));
    }

    #[test]
    fn unparseable_numbers_are_rejected() {
        let err = load(&[("AI_API_RETRY_MAX_RETRIES", "three")]).expect_err("must fail");
        assert!(matches!(err, RefineError::Config(_)));
    }

    #[test]
    fn oversized_retry_count_is_rejected() {
        let err = load(&[("AI_API_RETRY_MAX_RETRIES", "18446744073709551615")])
            .expect_err("retry count above the limit");
        assert!(matches!(err, RefineError::Config(_)));
    }

    #[test]
    fn inconsistent_retry_bounds_are_rejected() {
        let err = load(&[
            ("AI_API_RETRY_INITIAL_DELAY_MS", "5000"),
            ("AI_API_RETRY_MAX_DELAY_MS", "1000"),
        ])
        .expect_err("cap below initial delay");
        assert!(matches!(err, RefineError::Config(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = load(&[("AI_API_KEY", "gsk_secret"), ("AI_API_URL", "https://x")])
            .expect("must load");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("gsk_secret"));
    }
}
