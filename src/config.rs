//! Runtime configuration for the marketplace.
//!
//! Configuration is plain data: every struct deserializes with `serde`,
//! falls back to [`Default`] for omitted fields and offers named presets.
//! Nothing here is global; callers hand the values to the services that
//! need them.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the configuration schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values parsed but are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Authentication envelope settings.
///
/// # Examples
///
/// ```
/// use bounty_board::config::AuthConfig;
///
/// let config = AuthConfig::default();
/// assert_eq!(config.freshness_window_secs, 300);
///
/// let strict = AuthConfig::strict();
/// assert!(strict.freshness_window_secs < config.freshness_window_secs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Namespace prefix of every signed message.
    pub namespace: String,
    /// Maximum distance between the envelope timestamp and server time.
    pub freshness_window_secs: u64,
    /// Shortest accepted signature string.
    pub min_signature_len: usize,
    /// Longest accepted signature string.
    pub max_signature_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            namespace: "bounty-board".to_owned(),
            freshness_window_secs: 300,
            min_signature_len: 20,
            max_signature_len: 200,
        }
    }
}

impl AuthConfig {
    /// Creates a strict configuration with a one-minute freshness window
    /// and a signature length matching base64 compact signatures.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            freshness_window_secs: 60,
            min_signature_len: 88,
            max_signature_len: 88,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("auth namespace must not be blank".to_owned()));
        }
        if self.min_signature_len > self.max_signature_len {
            return Err(ConfigError::Invalid(format!(
                "min_signature_len {} exceeds max_signature_len {}",
                self.min_signature_len, self.max_signature_len
            )));
        }
        Ok(())
    }
}

/// Task board listing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Largest page a listing may return.
    pub max_page_size: usize,
    /// Page size used when the caller gives none.
    pub default_page_size: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            max_page_size: 200,
            default_page_size: 50,
        }
    }
}

impl BoardConfig {
    /// Resolves a requested page size.
    ///
    /// A missing or zero request yields the default size; requests above the
    /// maximum are capped.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounty_board::config::BoardConfig;
    ///
    /// let config = BoardConfig::default();
    /// assert_eq!(config.clamp_limit(None), 50);
    /// assert_eq!(config.clamp_limit(Some(0)), 50);
    /// assert_eq!(config.clamp_limit(Some(10)), 10);
    /// assert_eq!(config.clamp_limit(Some(5_000)), 200);
    /// ```
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.default_page_size.min(self.max_page_size),
            Some(limit) => limit.min(self.max_page_size),
        }
    }

    fn validate(self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Complete marketplace configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Authentication envelope settings.
    pub auth: AuthConfig,
    /// Task board listing settings.
    pub board: BoardConfig,
}

impl MarketplaceConfig {
    /// Parses a JSON document, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for inconsistent values.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.auth.validate()?;
        config.board.validate()?;
        Ok(config)
    }
}
