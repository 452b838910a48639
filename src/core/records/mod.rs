//! Record store clients.

pub mod airtable;

pub use airtable::{AIRTABLE_API_URL, AirtableStore};
