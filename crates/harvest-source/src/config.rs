use harvest_model::{KEY_PASSWORD, KEY_SERVER_URL, KEY_USERNAME, ModelError, TaskConfig};

/// Source table / endpoint name.
pub const KEY_ENDPOINT: &str = "Endpoint";
/// Record field holding the ordering timestamp.
pub const KEY_TIMESTAMP_FIELD: &str = "TimestampField";
/// Cursor to start from when no checkpoint exists.
pub const KEY_NEXT_RECORD_TIME: &str = "NextRecordTime";
/// Page size requested from the source.
pub const KEY_RECORD_COUNT: &str = "RecordCount";
/// Record field holding the unique record ID.
pub const KEY_ID_FIELD: &str = "IdField";

pub const DEFAULT_ID_FIELD: &str = "sys_id";

/// Typed poll settings of one incremental-poll task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub server_url: String,
    pub endpoint: String,
    pub timestamp_field: String,
    pub id_field: String,
    pub next_record_time: String,
    pub page_size: usize,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PollConfig {
    pub fn from_task(task: &TaskConfig) -> Result<Self, ModelError> {
        let raw_count = task.require(KEY_RECORD_COUNT)?;
        let page_size = raw_count
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ModelError::InvalidValue {
                key: KEY_RECORD_COUNT.to_string(),
                reason: format!("expected a positive integer, got {raw_count:?}"),
            })?;

        Ok(Self {
            server_url: task.require(KEY_SERVER_URL)?.trim_end_matches('/').to_string(),
            endpoint: task.require(KEY_ENDPOINT)?.to_string(),
            timestamp_field: task.require(KEY_TIMESTAMP_FIELD)?.to_string(),
            id_field: task
                .get(KEY_ID_FIELD)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(DEFAULT_ID_FIELD)
                .to_string(),
            next_record_time: task.require(KEY_NEXT_RECORD_TIME)?.to_string(),
            page_size,
            username: task.get(KEY_USERNAME).map(str::to_string),
            password: task.get(KEY_PASSWORD).map(str::to_string),
        })
    }

    /// Page request at `cursor`: `timestamp >= cursor`, ascending, one page.
    pub fn request_url(&self, cursor: &str) -> String {
        format!(
            "{base}/{endpoint}.do?JSONv2&sysparm_query={field}>={cursor}^ORDERBY{field}&sysparm_record_count={count}",
            base = self.server_url,
            endpoint = self.endpoint,
            field = self.timestamp_field,
            cursor = cursor.replacen(' ', "+", 1),
            count = self.page_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use harvest_model::{KEY_APP, KEY_TASK};

    use super::*;

    fn task(extra: &[(&str, &str)]) -> TaskConfig {
        let mut pairs = vec![
            (KEY_APP, "snow"),
            (KEY_TASK, "snow-incident"),
            (KEY_SERVER_URL, "https://example.service-now.com/"),
            (KEY_ENDPOINT, "incident"),
            (KEY_TIMESTAMP_FIELD, "sys_updated_on"),
            (KEY_NEXT_RECORD_TIME, "2015-01-01 00:00:00"),
            (KEY_RECORD_COUNT, "500"),
        ];
        pairs.extend_from_slice(extra);
        TaskConfig::from_pairs(pairs).unwrap()
    }

    #[test]
    fn builds_request_url() {
        let cfg = PollConfig::from_task(&task(&[])).unwrap();
        assert_eq!(
            cfg.request_url("2015-01-01 10:00:00"),
            "https://example.service-now.com/incident.do?JSONv2&sysparm_query=sys_updated_on>=2015-01-01+10:00:00^ORDERBYsys_updated_on&sysparm_record_count=500"
        );
        assert_eq!(cfg.id_field, DEFAULT_ID_FIELD);
        assert_eq!(cfg.username, None);
    }

    #[test]
    fn rejects_bad_record_count() {
        let err = PollConfig::from_task(&task(&[(KEY_RECORD_COUNT, "0")])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidValue { .. }));
    }

    #[test]
    fn custom_id_field_and_credentials() {
        let cfg = PollConfig::from_task(&task(&[
            (KEY_ID_FIELD, "number"),
            (KEY_USERNAME, "admin"),
            (KEY_PASSWORD, "secret"),
        ]))
        .unwrap();
        assert_eq!(cfg.id_field, "number");
        assert_eq!(cfg.username.as_deref(), Some("admin"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));
    }
}
