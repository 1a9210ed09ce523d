use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::GzDecoder;
use harvest_model::{Page, Record};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, HeaderMap};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PollConfig;
use crate::error::SourceError;

/// Upper bound of one page request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Fetches pages of one source feed.
#[derive(Clone)]
pub struct SourcePoller {
    client: reqwest::Client,
    config: Arc<PollConfig>,
}

impl SourcePoller {
    pub fn new(client: reqwest::Client, config: Arc<PollConfig>) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Fetch the page starting at `cursor`.
    pub async fn fetch(&self, cursor: &str) -> Result<Page, SourceError> {
        let url = self.config.request_url(cursor);
        debug!(%url, "requesting page");

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_ENCODING, "gzip")
            .timeout(REQUEST_TIMEOUT);
        if let Some(user) = &self.config.username {
            request = request.basic_auth(user, self.config.password.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let gzipped = is_gzip_encoded(response.headers());
        let body = response.bytes().await?;
        let body = decode_body(&body, gzipped)?;

        parse_page(&body, &self.config.id_field, &self.config.timestamp_field)
    }
}

fn is_gzip_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"))
}

/// Inflate a gzip body, either announced by the header or recognized by its magic bytes.
pub fn decode_body(body: &[u8], gzipped: bool) -> Result<Vec<u8>, SourceError> {
    if !gzipped && !body.starts_with(&GZIP_MAGIC) {
        return Ok(body.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(SourceError::Decompress)?;
    Ok(out)
}

/// Decode a response body into a page.
///
/// Entries missing the ID or timestamp field are dropped but still count as fetched.
/// A body carrying `error` instead of `records` is rejected.
pub fn parse_page(body: &[u8], id_field: &str, timestamp_field: &str) -> Result<Page, SourceError> {
    let value: Value = serde_json::from_slice(body)?;

    if let Some(entries) = value.get("records").and_then(Value::as_array) {
        let fetched = entries.len();
        let records = entries
            .iter()
            .filter_map(|entry| {
                match Record::from_value(entry.clone(), id_field, timestamp_field) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(error = %e, "dropping malformed source record");
                        None
                    }
                }
            })
            .collect();
        return Ok(Page::with_fetched(records, fetched));
    }

    if let Some(err) = value.get("error") {
        let reason = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(SourceError::Rejected(reason));
    }

    Ok(Page::default())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{Compression, write::GzEncoder};

    use super::*;

    #[test]
    fn parses_records_and_counts_dropped_entries() {
        let body = br#"{"records":[
            {"sys_id":"a","sys_updated_on":"2015-01-01 10:00:00","short_description":"disk"},
            {"sys_updated_on":"2015-01-01 10:00:01"},
            {"sys_id":"c","sys_updated_on":"2015-01-01 10:00:02"}
        ]}"#;
        let page = parse_page(body, "sys_id", "sys_updated_on").unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page.fetched(), 3);
        assert_eq!(page.records()[0].id(), "a");
        assert_eq!(page.records()[1].timestamp(), "2015-01-01 10:00:02");
    }

    #[test]
    fn error_payload_is_rejected() {
        let body = br#"{"error":"Invalid table"}"#;
        let err = parse_page(body, "sys_id", "sys_updated_on").unwrap_err();
        assert!(matches!(err, SourceError::Rejected(reason) if reason == "Invalid table"));
    }

    #[test]
    fn body_without_records_is_an_empty_page() {
        let page = parse_page(b"{}", "sys_id", "sys_updated_on").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn gzip_is_detected_by_magic_bytes() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(br#"{"records":[]}"#).unwrap();
        let compressed = enc.finish().unwrap();

        assert_eq!(decode_body(&compressed, false).unwrap(), br#"{"records":[]}"#);
        assert_eq!(decode_body(b"plain", false).unwrap(), b"plain");
    }

    #[test]
    fn announced_gzip_that_is_not_gzip_fails() {
        assert!(matches!(
            decode_body(b"plain", true),
            Err(SourceError::Decompress(_))
        ));
    }
}
