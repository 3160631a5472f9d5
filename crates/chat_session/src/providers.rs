use std::sync::Arc;

use generation_provider::GenerationProvider;
use generation_provider_mock::{ScriptedProvider, MOCK_PROVIDER_ID};

pub const DEFAULT_PROVIDER_ID: &str = MOCK_PROVIDER_ID;
pub const PROVIDER_ENV_VAR: &str = "COWRITE_PROVIDER";

const AVAILABLE_PROVIDERS: &[&str] = &[MOCK_PROVIDER_ID];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("unsupported provider '{requested}' (available: {available})")]
    Unsupported {
        requested: String,
        available: String,
    },
}

/// Builds the provider named by `COWRITE_PROVIDER`, or the default one.
pub fn provider_from_env() -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    let provider_id = provider_id_from(std::env::var(PROVIDER_ENV_VAR).ok());
    tracing::debug!(%provider_id, "selecting generation provider");
    provider_for_id(&provider_id)
}

/// Normalizes a raw selection: trimmed, lowercased, blank means default.
fn provider_id_from(raw: Option<String>) -> String {
    raw.map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string())
}

pub fn provider_for_id(provider_id: &str) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    match provider_id {
        MOCK_PROVIDER_ID => Ok(Arc::new(ScriptedProvider::default())),
        requested => Err(ProviderError::Unsupported {
            requested: requested.to_string(),
            available: AVAILABLE_PROVIDERS.join(", "),
        }),
    }
}
