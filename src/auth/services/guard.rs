//! Envelope authentication service.

use crate::auth::{
    domain::{AuthEnvelope, AuthError, AuthenticatedActor, MarketplaceAction, SignedMessage},
    ports::SignatureVerifier,
};
use crate::config::AuthConfig;
use crate::marketplace::domain::AgentAddress;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::warn;

/// Turns raw envelopes into [`AuthenticatedActor`] values.
///
/// Checks run in a fixed order: address shape, timestamp freshness,
/// signature length, then the pluggable verifier.
#[derive(Clone)]
pub struct EnvelopeGuard<V, C>
where
    V: SignatureVerifier,
    C: Clock + Send + Sync,
{
    config: AuthConfig,
    verifier: Arc<V>,
    clock: Arc<C>,
}

impl<V, C> EnvelopeGuard<V, C>
where
    V: SignatureVerifier,
    C: Clock + Send + Sync,
{
    /// Creates a guard.
    #[must_use]
    pub const fn new(config: AuthConfig, verifier: Arc<V>, clock: Arc<C>) -> Self {
        Self {
            config,
            verifier,
            clock,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticates `envelope` for `action`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] naming the first check that failed.
    pub fn authenticate(
        &self,
        envelope: &AuthEnvelope,
        action: MarketplaceAction,
    ) -> Result<AuthenticatedActor, AuthError> {
        self.check(envelope, action).inspect_err(|err| {
            warn!(
                address = envelope.address(),
                action = action.as_str(),
                error = %err,
                "authentication rejected"
            );
        })
    }

    fn check(
        &self,
        envelope: &AuthEnvelope,
        action: MarketplaceAction,
    ) -> Result<AuthenticatedActor, AuthError> {
        let address = AgentAddress::new(envelope.address()).map_err(AuthError::InvalidAddress)?;
        let signed_at = self.fresh_timestamp(envelope.timestamp())?;
        self.check_signature_shape(envelope.signature())?;

        let message = SignedMessage::new(
            &self.config.namespace,
            action,
            &address,
            envelope.timestamp(),
        );
        self.verifier
            .verify(&address, &message, envelope.signature())
            .map_err(|rejection| AuthError::SignatureRejected(rejection.0))?;

        Ok(AuthenticatedActor::new(address, action, signed_at))
    }

    fn fresh_timestamp(&self, raw: &str) -> Result<DateTime<Utc>, AuthError> {
        let signed_at = parse_timestamp(raw.trim())
            .ok_or_else(|| AuthError::MalformedTimestamp(raw.to_owned()))?;

        let window_secs = self.config.freshness_window_secs;
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let skew = self.clock.utc().signed_duration_since(signed_at).abs();
        if skew > window {
            return Err(AuthError::StaleTimestamp {
                skew_secs: skew.num_seconds(),
                window_secs,
            });
        }
        Ok(signed_at)
    }

    fn check_signature_shape(&self, signature: &str) -> Result<(), AuthError> {
        let length = signature.chars().count();
        let min = self.config.min_signature_len;
        let max = self.config.max_signature_len;
        if length < min || length > max {
            return Err(AuthError::MalformedSignature { length, min, max });
        }
        Ok(())
    }
}

/// Parses an ISO-8601 timestamp; values without an offset are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
        .ok()
}
