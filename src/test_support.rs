//! Shared unit-test doubles.

use crate::auth::{
    adapters::ShapeOnlyVerifier,
    domain::{AuthEnvelope, AuthenticatedActor, MarketplaceAction},
    services::EnvelopeGuard,
};
use crate::config::AuthConfig;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex};

/// Clock returning a settable instant.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Creates a clock frozen at `now`.
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        let mut now = self.0.lock().expect("clock lock should not be poisoned");
        *now += chrono::Duration::seconds(seconds);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(epoch())
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock should not be poisoned")
    }
}

/// Fixed reference instant used across unit tests.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0)
        .single()
        .expect("fixed timestamp should be valid")
}

/// Signature string accepted by the default configuration.
pub fn well_formed_signature() -> String {
    "H".repeat(88)
}

/// Authenticates `address` for `action` at `now` through the real guard.
pub fn actor_at(address: &str, action: MarketplaceAction, now: DateTime<Utc>) -> AuthenticatedActor {
    let guard = EnvelopeGuard::new(
        AuthConfig::default(),
        Arc::new(ShapeOnlyVerifier),
        Arc::new(FixedClock::at(now)),
    );
    let envelope = AuthEnvelope::new(address, well_formed_signature(), now.to_rfc3339());
    guard
        .authenticate(&envelope, action)
        .expect("test envelope should authenticate")
}

/// Authenticates `address` for `action` at [`epoch`].
pub fn actor(address: &str, action: MarketplaceAction) -> AuthenticatedActor {
    actor_at(address, action, epoch())
}
