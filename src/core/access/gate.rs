//! Validation and consumption of access codes against a record store.
//!
//! [`AccessGate`] owns the check/consume workflow; the store behind it is
//! abstracted by the [`CodeStore`] trait so handlers and tests can inject a
//! fake without touching the network.

use async_trait::async_trait;
use time::OffsetDateTime;

use super::model::{AccessCode, RejectReason};

/// Failure talking to the record store, as opposed to a code being invalid.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never completed (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(String),
    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The store answered 2xx but the payload did not decode.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Gate-level failure, split by which half of the workflow broke.
///
/// `Consume` means the code already passed validation and only the
/// use-count write failed; callers must not report it as a rejected code.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("record store lookup failed: {0}")]
    Lookup(StoreError),
    #[error("record store rejected the use-count update: {0}")]
    Consume(StoreError),
}

/// Outcome of validating a code.
#[derive(Debug)]
pub enum Verdict {
    /// The code grants access. `used_count` is `Some` only when a use was
    /// consumed as part of the validation, carrying the post-increment count.
    Granted {
        record: AccessCode,
        used_count: Option<u32>,
    },
    /// The code does not grant access, for the stated reason.
    Denied(RejectReason),
}

/// Read/write access to the code records.
///
/// `find_active` must return at most one record whose `code` field equals
/// the input exactly, with inactive records excluded. `update_used_count`
/// is a partial-field update by record identifier.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn find_active(&self, code: &str) -> Result<Option<AccessCode>, StoreError>;
    async fn update_used_count(&self, record_id: &str, used_count: u32) -> Result<(), StoreError>;

    /// Reachability probe for diagnostics: list at most one record and
    /// report how many came back. Must not mutate anything.
    async fn probe(&self) -> Result<usize, StoreError>;
}

#[async_trait]
impl<T: CodeStore + ?Sized> CodeStore for &T {
    async fn find_active(&self, code: &str) -> Result<Option<AccessCode>, StoreError> {
        (**self).find_active(code).await
    }

    async fn update_used_count(&self, record_id: &str, used_count: u32) -> Result<(), StoreError> {
        (**self).update_used_count(record_id, used_count).await
    }

    async fn probe(&self) -> Result<usize, StoreError> {
        (**self).probe().await
    }
}

#[async_trait]
impl<T: CodeStore + ?Sized> CodeStore for std::sync::Arc<T> {
    async fn find_active(&self, code: &str) -> Result<Option<AccessCode>, StoreError> {
        (**self).find_active(code).await
    }

    async fn update_used_count(&self, record_id: &str, used_count: u32) -> Result<(), StoreError> {
        (**self).update_used_count(record_id, used_count).await
    }

    async fn probe(&self) -> Result<usize, StoreError> {
        (**self).probe().await
    }
}

/// Validates access codes and optionally spends one use.
///
/// The check and the increment are two separate store round-trips; the store
/// offers no compare-and-swap, so two concurrent requests can both read
/// `remaining = 1` and both be admitted. Accepted: contention is rare for
/// human-driven form traffic, and over-admitting by one beats locking.
pub struct AccessGate<S> {
    store: S,
}

impl<S: CodeStore> AccessGate<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Pure validity check. Never mutates the store.
    pub async fn check(&self, code: &str) -> Result<Verdict, GateError> {
        let record = self
            .store
            .find_active(code)
            .await
            .map_err(GateError::Lookup)?;

        let Some(record) = record else {
            return Ok(Verdict::Denied(RejectReason::NotFound));
        };

        match record.evaluate(OffsetDateTime::now_utc()) {
            Ok(()) => Ok(Verdict::Granted {
                record,
                used_count: None,
            }),
            Err(reason) => Ok(Verdict::Denied(reason)),
        }
    }

    /// Spend one use of an already-validated record.
    ///
    /// Returns the new use count. A store failure here surfaces as
    /// [`GateError::Consume`]: validation already succeeded, only the
    /// persistence failed.
    pub async fn consume(&self, record: &AccessCode) -> Result<u32, GateError> {
        let new_count = record.used_count + 1;
        self.store
            .update_used_count(&record.id, new_count)
            .await
            .map_err(GateError::Consume)?;
        Ok(new_count)
    }

    /// Check, then spend one use if the code is valid.
    ///
    /// Denials return without side effects. On success the returned verdict
    /// carries the post-increment use count and the refreshed record.
    pub async fn redeem(&self, code: &str) -> Result<Verdict, GateError> {
        match self.check(code).await? {
            Verdict::Granted { mut record, .. } => {
                let new_count = self.consume(&record).await?;
                record.used_count = new_count;
                Ok(Verdict::Granted {
                    record,
                    used_count: Some(new_count),
                })
            }
            denied => Ok(denied),
        }
    }
}
