//! Airtable-backed implementation of the access-code record store.
//!
//! # API Reference
//!
//! - List: `GET https://api.airtable.com/v0/{baseId}/{tableIdOrName}` with a
//!   `filterByFormula` query parameter
//! - Update: `PATCH https://api.airtable.com/v0/{baseId}/{tableIdOrName}/{recordId}`
//!
//! Expected fields in the access-code table: `Code` (single line text),
//! `Active` (checkbox, absent when unchecked), `Max_Uses` (number),
//! `Used_Count` (number), `Expires_At` (date, optional).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::core::access::{AccessCode, CodeStore, StoreError};

/// Airtable REST API base URL.
pub const AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Record store client for one Airtable table.
#[derive(Debug, Clone)]
pub struct AirtableStore {
    http: reqwest::Client,
    api_key: String,
    base_id: String,
    table: String,
    base_url: Url,
}

impl AirtableStore {
    /// Create a client for `{base_id}/{table}` using a shared HTTP client.
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        base_id: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        let base_url = Url::parse(AIRTABLE_API_URL).expect("constant URL is valid");
        Self {
            http,
            api_key: api_key.into(),
            base_id: base_id.into(),
            table: table.into(),
            base_url,
        }
    }

    /// Point the client at a different API origin. Used by tests to target a
    /// local mock server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn table_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("API base URL has a path")
            .extend([self.base_id.as_str(), self.table.as_str()]);
        url
    }

    fn record_url(&self, record_id: &str) -> Url {
        let mut url = self.table_url();
        url.path_segments_mut()
            .expect("API base URL has a path")
            .push(record_id);
        url
    }
}

#[async_trait]
impl CodeStore for AirtableStore {
    async fn find_active(&self, code: &str) -> Result<Option<AccessCode>, StoreError> {
        // The formula string is assembled with a dedicated escaper and then
        // handed to the query serializer for URL encoding; no hand-built
        // query strings.
        let response = self
            .http
            .get(self.table_url())
            .bearer_auth(&self.api_key)
            .query(&[
                ("filterByFormula", code_filter(code).as_str()),
                ("maxRecords", "1"),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let list = decode_list(response).await?;
        list.records
            .into_iter()
            .next()
            .map(AccessCode::try_from)
            .transpose()
    }

    async fn update_used_count(&self, record_id: &str, used_count: u32) -> Result<(), StoreError> {
        let response = self
            .http
            .patch(self.record_url(record_id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": { "Used_Count": used_count } }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Fetch one arbitrary record, verifying credentials and table access.
    /// Returns the record count seen (0 or 1) so an empty-but-reachable
    /// table is distinguishable from a bad table id.
    async fn probe(&self) -> Result<usize, StoreError> {
        let response = self
            .http
            .get(self.table_url())
            .bearer_auth(&self.api_key)
            .query(&[("maxRecords", "1")])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let list = decode_list(response).await?;
        Ok(list.records.len())
    }
}

/// Build the exact-match filter formula for a code.
///
/// Inactive records are excluded in the store, not client-side: the `Active`
/// checkbox counts as active when checked or when the field is blank.
fn code_filter(code: &str) -> String {
    format!(
        r#"AND({{Code}} = "{}", OR({{Active}} = 1, {{Active}} = ""))"#,
        escape_formula_string(code)
    )
}

/// Escape a value for interpolation into a double-quoted formula literal.
fn escape_formula_string(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', r#"\""#)
}

async fn decode_list(response: reqwest::Response) -> Result<ListRecordsResponse, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| StoreError::Malformed(e.to_string()))
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    #[serde(default)]
    records: Vec<CodeRecord>,
}

#[derive(Debug, Deserialize)]
struct CodeRecord {
    id: String,
    #[serde(default)]
    fields: CodeFields,
}

/// Airtable omits unchecked checkboxes and empty numbers, so every field is
/// optional on the wire.
#[derive(Debug, Default, Deserialize)]
struct CodeFields {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Active")]
    active: Option<bool>,
    #[serde(rename = "Max_Uses")]
    max_uses: Option<u32>,
    #[serde(rename = "Used_Count")]
    used_count: Option<u32>,
    #[serde(rename = "Expires_At")]
    expires_at: Option<String>,
}

impl TryFrom<CodeRecord> for AccessCode {
    type Error = StoreError;

    fn try_from(record: CodeRecord) -> Result<Self, StoreError> {
        let code = record.fields.code.ok_or_else(|| {
            StoreError::Malformed(format!("record {} has no Code field", record.id))
        })?;
        let expires_at = record
            .fields
            .expires_at
            .as_deref()
            .and_then(|raw| match parse_expiry(raw) {
                Some(instant) => Some(instant),
                None => {
                    tracing::warn!(record_id = %record.id, value = %raw, "ignoring unparseable Expires_At");
                    None
                }
            });
        Ok(AccessCode {
            id: record.id,
            code,
            active: record.fields.active,
            max_uses: record.fields.max_uses.unwrap_or(0),
            used_count: record.fields.used_count.unwrap_or(0),
            expires_at,
        })
    }
}

/// Parse an Airtable date value.
///
/// Date-time fields serialize as RFC 3339; date-only fields as `YYYY-MM-DD`,
/// which is taken to expire at UTC midnight of that day.
fn parse_expiry(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(instant);
    }
    let date_format = time::macros::format_description!("[year]-[month]-[day]");
    time::Date::parse(raw, &date_format)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn store() -> AirtableStore {
        AirtableStore::new(
            reqwest::Client::new(),
            "key_test",
            "appBASE",
            "Access_Codes",
        )
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_formula_string("PLAIN-1"), "PLAIN-1");
        assert_eq!(escape_formula_string(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_formula_string(r"a\b"), r"a\\b");
        // Backslash-then-quote does not reopen the string literal
        assert_eq!(escape_formula_string(r#"\""#), r#"\\\""#);
    }

    #[test]
    fn filter_matches_code_and_active_flag() {
        assert_eq!(
            code_filter("BETA-2025"),
            r#"AND({Code} = "BETA-2025", OR({Active} = 1, {Active} = ""))"#
        );
    }

    #[test]
    fn lookup_request_is_parameterized() {
        let store = store();
        let request = store
            .http
            .get(store.table_url())
            .bearer_auth(&store.api_key)
            .query(&[
                ("filterByFormula", code_filter(r#"we"ird"#).as_str()),
                ("maxRecords", "1"),
            ])
            .build()
            .unwrap();

        let url = request.url();
        assert_eq!(url.path(), "/v0/appBASE/Access_Codes");
        let filter = url
            .query_pairs()
            .find(|(k, _)| k == "filterByFormula")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(filter, r#"AND({Code} = "we\"ird", OR({Active} = 1, {Active} = ""))"#);
        assert_eq!(request.headers()["Authorization"], "Bearer key_test");
    }

    #[test]
    fn table_name_is_path_encoded() {
        let store = AirtableStore::new(reqwest::Client::new(), "k", "appBASE", "Access Codes");
        assert_eq!(store.table_url().path(), "/v0/appBASE/Access%20Codes");
    }

    #[test]
    fn list_response_maps_to_access_code() {
        let payload = r#"{
            "records": [{
                "id": "recXYZ",
                "createdTime": "2025-01-01T00:00:00.000Z",
                "fields": {
                    "Code": "BETA-2025",
                    "Active": true,
                    "Max_Uses": 3,
                    "Used_Count": 2,
                    "Expires_At": "2025-12-31"
                }
            }]
        }"#;
        let list: ListRecordsResponse = serde_json::from_str(payload).unwrap();
        let record = AccessCode::try_from(list.records.into_iter().next().unwrap()).unwrap();

        assert_eq!(record.id, "recXYZ");
        assert_eq!(record.code, "BETA-2025");
        assert_eq!(record.active, Some(true));
        assert_eq!(record.remaining(), Some(1));
        assert_eq!(record.expires_at, Some(datetime!(2025-12-31 0:00 UTC)));
    }

    #[test]
    fn absent_fields_default_to_unlimited_and_unused() {
        let payload = r#"{"records": [{"id": "recA", "fields": {"Code": "X"}}]}"#;
        let list: ListRecordsResponse = serde_json::from_str(payload).unwrap();
        let record = AccessCode::try_from(list.records.into_iter().next().unwrap()).unwrap();

        assert_eq!(record.max_uses, 0);
        assert_eq!(record.used_count, 0);
        assert_eq!(record.active, None);
        assert_eq!(record.remaining(), None);
        assert_eq!(record.expires_at, None);
    }

    #[test]
    fn record_without_code_field_is_malformed() {
        let payload = r#"{"records": [{"id": "recA", "fields": {"Max_Uses": 5}}]}"#;
        let list: ListRecordsResponse = serde_json::from_str(payload).unwrap();
        let err = AccessCode::try_from(list.records.into_iter().next().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn parses_both_airtable_date_shapes() {
        assert_eq!(
            parse_expiry("2025-06-15T10:30:00Z"),
            Some(datetime!(2025-06-15 10:30 UTC))
        );
        assert_eq!(
            parse_expiry("2025-06-15T10:30:00.000Z"),
            Some(datetime!(2025-06-15 10:30 UTC))
        );
        assert_eq!(parse_expiry("2000-01-01"), Some(datetime!(2000-01-01 0:00 UTC)));
        assert_eq!(parse_expiry("next tuesday"), None);
    }
}
