//! Inference backend implementations for Folio.
//!
//! All backends implement the `folio_core::InferenceClient` trait.
//! `build_from_config` selects the backend from the configured mode.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

use folio_config::{AppConfig, Mode};
use folio_core::error::InferenceError;
use folio_core::inference::InferenceClient;
use std::sync::Arc;
use tracing::info;

/// Build the inference client for the configured mode.
///
/// Called once at process start; the returned client is shared across all
/// concurrent turns. Missing credentials are an error here, before any
/// traffic is served.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn InferenceClient>, InferenceError> {
    config
        .require_credentials()
        .map_err(|e| InferenceError::NotConfigured(e.to_string()))?;

    let client: Arc<dyn InferenceClient> = match config.mode {
        Mode::Remote => {
            info!(api_url = %config.remote.api_url, "Using remote inference backend");
            Arc::new(OpenAiCompatClient::openrouter(
                &config.remote.api_url,
                config.api_key.clone().unwrap_or_default(),
            )?)
        }
        Mode::Local => {
            info!(api_url = %config.local.api_url, "Using local inference backend");
            Arc::new(OpenAiCompatClient::ollama(&config.local.api_url)?)
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_mode_without_key_is_an_error() {
        let config = AppConfig::default();
        let Err(err) = build_from_config(&config) else {
            panic!("expected remote mode without key to be an error");
        };
        assert!(matches!(err, InferenceError::NotConfigured(_)));
    }

    #[test]
    fn remote_mode_with_key_builds_openrouter() {
        let config = AppConfig {
            api_key: Some("sk-or-test".into()),
            ..AppConfig::default()
        };
        let client = build_from_config(&config).unwrap();
        assert_eq!(client.name(), "openrouter");
    }

    #[test]
    fn local_mode_builds_ollama() {
        let config = AppConfig {
            mode: Mode::Local,
            local: folio_config::LocalConfig {
                chat_model: Some("llama3.2".into()),
                ..folio_config::LocalConfig::default()
            },
            ..AppConfig::default()
        };
        let client = build_from_config(&config).unwrap();
        assert_eq!(client.name(), "ollama");
    }
}
