//! Access-code validation and consumption.

mod gate;
mod model;

pub use gate::{AccessGate, CodeStore, GateError, StoreError, Verdict};
pub use model::{AccessCode, RejectReason};
