//! `tonepolish` rephrases raw text professionally and empathetically.
//!
//! Rewriting is delegated to a [`TextRefiner`]:
//! - [`ChatCompletionClient`] calls an OpenAI-compatible chat-completion API
//!   through a [`RetryExecutor`] with capped exponential backoff
//! - [`LocalRefiner`] is a deterministic offline stand-in
//!
//! [`server::router`] exposes the chosen refiner as `POST /api/refine`.

mod client;
mod config;
mod error;
mod local;
mod options;
mod prompt;
mod refiner;
mod retry;
pub mod server;
mod wire;

pub use client::{ChatCompletionClient, DEFAULT_MODEL, REQUEST_TIMEOUT};
pub use config::{ApiCredentials, RefineConfig};
pub use error::{is_retryable_status, RefineError};
pub use local::{LocalRefiner, DEFAULT_LOCAL_DELAY};
pub use options::{RetryPolicy, MAX_RETRIES_LIMIT};
pub use prompt::SystemPrompt;
pub use refiner::{select_refiner, TextRefiner};
pub use retry::RetryExecutor;

pub type Result<T> = std::result::Result<T, RefineError>;
