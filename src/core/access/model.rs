//! Access-code record model and validity evaluation.
//!
//! An [`AccessCode`] mirrors one row of the external record store. Validity
//! is evaluated locally against a caller-supplied "now" so the rules can be
//! tested without a clock or a network.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Why a code was rejected.
///
/// Rejections are ordinary outcomes, not server errors: the store answered,
/// the code just does not grant access right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// No active record matches the supplied code.
    NotFound,
    /// The record's expiry date is in the past.
    Expired,
    /// The record has a bounded use count and it is spent.
    Exhausted,
}

impl RejectReason {
    /// Stable machine-readable identifier, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Expired => "EXPIRED",
            Self::Exhausted => "EXHAUSTED",
        }
    }

    /// Human-readable message suitable for direct display in the front-end.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Invalid or inactive access code.",
            Self::Expired => "This code has expired.",
            Self::Exhausted => "This code has no uses left.",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// One access-code record as read from the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCode {
    /// Record identifier in the store, used for follow-up updates.
    pub id: String,
    /// The shared-secret string the user typed, matched exactly.
    pub code: String,
    /// Active flag; `None` (field absent) is treated as active. The store
    /// query already filters inactive records out, so this is belt-level.
    pub active: Option<bool>,
    /// Maximum number of uses; 0 means unlimited.
    pub max_uses: u32,
    /// Uses recorded so far. Monotonically increasing.
    pub used_count: u32,
    /// Optional expiry instant; past instants invalidate the code.
    pub expires_at: Option<OffsetDateTime>,
}

impl AccessCode {
    /// Uses left before the code is exhausted, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        if self.max_uses == 0 {
            None
        } else {
            Some(self.max_uses.saturating_sub(self.used_count))
        }
    }

    /// Whether the code's expiry instant lies before `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_at, Some(expires) if now > expires)
    }

    /// Evaluate validity at `now`.
    ///
    /// Order matters and is part of the contract: expiry is checked before
    /// exhaustion, so an expired code reports `Expired` even with uses left.
    pub fn evaluate(&self, now: OffsetDateTime) -> Result<(), RejectReason> {
        if self.active == Some(false) {
            return Err(RejectReason::NotFound);
        }
        if self.is_expired(now) {
            return Err(RejectReason::Expired);
        }
        if self.max_uses > 0 && self.used_count >= self.max_uses {
            return Err(RejectReason::Exhausted);
        }
        Ok(())
    }
}
