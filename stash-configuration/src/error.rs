use thiserror::Error;

/// Errors raised while loading configuration.
///
/// Every variant is fatal: a filter is never built from a configuration
/// that failed to load.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("invalid cache entry `{entry}`: {reason}")]
    InvalidEntry { entry: String, reason: &'static str },

    #[error("invalid max age `{value}` in cache entry `{entry}`")]
    InvalidMaxAge { entry: String, value: String },

    #[error("cache entry `{entry}` has no max age")]
    MissingMaxAge { entry: String },

    #[error("invalid pattern in cache entry `{entry}`: {source}")]
    InvalidPattern {
        entry: String,
        #[source]
        source: regex::Error,
    },
}
