//! Core domain logic: access-code gating and the external service clients.

pub mod access;
pub mod records;
pub mod voice;

// Re-export commonly used types for convenience
pub use access::{AccessCode, AccessGate, CodeStore, GateError, RejectReason, StoreError, Verdict};
pub use records::AirtableStore;
pub use voice::{CallCredential, CallMetadata, RetellClient, VoiceBackend, VoiceError};
