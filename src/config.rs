//! Environment configuration.

use std::env;

use thiserror::Error;

use crate::core::marker::{MarkerError, MarkerKind, MarkerPair};

pub const LOG_FILTER_ENV_VAR: &str = "COWRITE_LOG";
pub const LOG_ANSI_ENV_VAR: &str = "COWRITE_LOG_ANSI";
pub const SEGMENT_START_ENV_VAR: &str = "COWRITE_SEGMENT_START";
pub const SEGMENT_END_ENV_VAR: &str = "COWRITE_SEGMENT_END";
pub const DELETE_START_ENV_VAR: &str = "COWRITE_DELETE_START";
pub const DELETE_END_ENV_VAR: &str = "COWRITE_DELETE_END";

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{set} is set but {missing} is not; marker overrides must come in pairs")]
    IncompleteMarkerPair {
        set: &'static str,
        missing: &'static str,
    },

    #[error("invalid markers from {start_key}/{end_key}: {source}")]
    InvalidMarkers {
        start_key: &'static str,
        end_key: &'static str,
        #[source]
        source: MarkerError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub log_filter: String,
    pub log_ansi: bool,
    pub segment_markers: MarkerPair,
    pub delete_markers: MarkerPair,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_ansi: false,
            segment_markers: MarkerPair::segment(),
            delete_markers: MarkerPair::delete(),
        }
    }
}

impl EnvConfig {
    /// Reads the environment, rejecting malformed marker overrides.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_filter: env_string_opt(LOG_FILTER_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_ansi: env_flag(LOG_ANSI_ENV_VAR),
            segment_markers: markers_from_env(
                MarkerKind::Segment,
                SEGMENT_START_ENV_VAR,
                SEGMENT_END_ENV_VAR,
            )?,
            delete_markers: markers_from_env(
                MarkerKind::Delete,
                DELETE_START_ENV_VAR,
                DELETE_END_ENV_VAR,
            )?,
        })
    }

    /// Reads the environment, falling back to the built-in pair for any
    /// malformed marker override.
    pub fn from_env() -> Self {
        let segment_markers =
            markers_from_env(MarkerKind::Segment, SEGMENT_START_ENV_VAR, SEGMENT_END_ENV_VAR)
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, "using default segment markers");
                    MarkerPair::segment()
                });
        let delete_markers =
            markers_from_env(MarkerKind::Delete, DELETE_START_ENV_VAR, DELETE_END_ENV_VAR)
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, "using default delete markers");
                    MarkerPair::delete()
                });

        Self {
            log_filter: env_string_opt(LOG_FILTER_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_ansi: env_flag(LOG_ANSI_ENV_VAR),
            segment_markers,
            delete_markers,
        }
    }
}

fn markers_from_env(
    kind: MarkerKind,
    start_key: &'static str,
    end_key: &'static str,
) -> Result<MarkerPair, ConfigError> {
    match (env_string_opt(start_key), env_string_opt(end_key)) {
        (None, None) => Ok(MarkerPair::default_for(kind)),
        (Some(_), None) => Err(ConfigError::IncompleteMarkerPair {
            set: start_key,
            missing: end_key,
        }),
        (None, Some(_)) => Err(ConfigError::IncompleteMarkerPair {
            set: end_key,
            missing: start_key,
        }),
        (Some(start), Some(end)) => {
            MarkerPair::new(start, end).map_err(|source| ConfigError::InvalidMarkers {
                start_key,
                end_key,
                source,
            })
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
