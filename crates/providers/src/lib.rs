//! LLM provider implementations for the Bixso Orchestrator.
//!
//! Two backends implement [`bixso_core::Provider`]:
//! - [`OpenAiCompatProvider`] — OpenAI and any `/v1/chat/completions` clone
//! - [`GeminiProvider`] — Google Gemini `generateContent`
//!
//! [`build_from_config`] selects and constructs the provider named by
//! `default_provider` in the configuration.

pub mod gemini;
pub mod openai_compat;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;

use bixso_config::AppConfig;
use bixso_core::{Provider, ProviderError};
use std::sync::Arc;

/// Build the configured provider.
///
/// The API key is resolved in priority order: per-provider config entry,
/// then the top-level `api_key`. A missing key is an error here — the
/// caller decides whether that halts startup or just degrades it.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!("No API key configured for provider '{name}'"))
        })?;

    match name {
        "gemini" => {
            let base_url = provider_config.and_then(|p| p.api_url.clone());
            Ok(Arc::new(GeminiProvider::new(api_key, base_url)))
        }
        _ => {
            let base_url = provider_config
                .and_then(|p| p.api_url.clone())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_an_error() {
        let config = AppConfig::default();
        let err = build_from_config(&config).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn openai_provider_from_top_level_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn gemini_provider_selected_by_name() {
        let config = AppConfig {
            api_key: Some("g-test".into()),
            default_provider: "gemini".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn per_provider_key_takes_priority() {
        let mut config = AppConfig {
            api_key: Some("global-key".into()),
            default_provider: "local".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "local".into(),
            bixso_config::ProviderConfig {
                api_key: Some("local-key".into()),
                api_url: Some("http://localhost:11434/v1".into()),
                default_model: None,
            },
        );
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "local");
    }
}
