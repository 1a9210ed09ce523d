#![allow(dead_code)]

use std::{
    io::Write,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use flate2::{Compression, write::GzEncoder};
use harvest_model::{KEY_APP, KEY_SERVER_URL, KEY_TASK, TaskConfig};
use harvest_source::{KEY_ENDPOINT, KEY_NEXT_RECORD_TIME, KEY_RECORD_COUNT, KEY_TIMESTAMP_FIELD};
use serde_json::{Value, json};

pub const START: &str = "2015-01-01 00:00:00";

/// How the fake feed answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Plain,
    Gzip,
    Error,
    Unavailable,
}

/// Timestamp-ordered feed served on `/incident.do`.
pub struct Feed {
    records: Mutex<Vec<(String, String)>>,
    mode: Mutex<Mode>,
    delay: Duration,
    pub hits: AtomicUsize,
    pub authorized: AtomicUsize,
    pub cursors: Mutex<Vec<String>>,
}

impl Feed {
    pub fn new(records: &[(&str, &str)]) -> Arc<Self> {
        Self::with_delay(records, Duration::ZERO)
    }

    pub fn with_delay(records: &[(&str, &str)], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(
                records
                    .iter()
                    .map(|(id, ts)| (id.to_string(), ts.to_string()))
                    .collect(),
            ),
            mode: Mutex::new(Mode::Plain),
            delay,
            hits: AtomicUsize::new(0),
            authorized: AtomicUsize::new(0),
            cursors: Mutex::new(Vec::new()),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn cursors(&self) -> Vec<String> {
        self.cursors.lock().unwrap().clone()
    }

    fn page(&self, cursor: &str, count: usize) -> Value {
        let records: Vec<Value> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, ts)| ts.as_str() >= cursor)
            .take(count)
            .map(|(id, ts)| json!({"sys_id": id, "sys_updated_on": ts, "state": "new"}))
            .collect();
        json!({ "records": records })
    }
}

/// Serve `feed` on an ephemeral local port.
pub async fn serve(feed: Arc<Feed>) -> SocketAddr {
    let app = Router::new()
        .route("/incident.do", get(incident))
        .with_state(feed);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn incident(
    State(feed): State<Arc<Feed>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    feed.hits.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key(header::AUTHORIZATION) {
        feed.authorized.fetch_add(1, Ordering::SeqCst);
    }
    if !feed.delay.is_zero() {
        tokio::time::sleep(feed.delay).await;
    }

    let (cursor, count) = parse_query(query.as_deref().unwrap_or_default());
    feed.cursors.lock().unwrap().push(cursor.clone());

    let mode = *feed.mode.lock().unwrap();
    match mode {
        Mode::Plain => feed.page(&cursor, count).to_string().into_response(),
        Mode::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(feed.page(&cursor, count).to_string().as_bytes())
                .unwrap();
            (
                [(header::CONTENT_ENCODING, "gzip")],
                enc.finish().unwrap(),
            )
                .into_response()
        }
        Mode::Error => json!({"error": "Invalid table"}).to_string().into_response(),
        Mode::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Pull the cursor and page size out of `sysparm_query=<f>>=<ts>^ORDERBY<f>&sysparm_record_count=<n>`.
fn parse_query(raw: &str) -> (String, usize) {
    let raw = raw.replace("%3E", ">").replace("%3e", ">").replace("%5E", "^");
    let mut cursor = String::new();
    let mut count = usize::MAX;
    for part in raw.split('&') {
        if let Some(query) = part.strip_prefix("sysparm_query=") {
            let cond = query.split('^').next().unwrap_or_default();
            if let Some((_, ts)) = cond.split_once(">=") {
                cursor = ts.replace('+', " ").replace("%20", " ");
            }
        } else if let Some(n) = part.strip_prefix("sysparm_record_count=") {
            count = n.parse().unwrap();
        }
    }
    (cursor, count)
}

pub fn task(addr: SocketAddr, page_size: usize) -> TaskConfig {
    TaskConfig::from_pairs([
        (KEY_APP, "snow".to_string()),
        (KEY_TASK, "snow-incident".to_string()),
        (KEY_SERVER_URL, format!("http://{addr}")),
        (KEY_ENDPOINT, "incident".to_string()),
        (KEY_TIMESTAMP_FIELD, "sys_updated_on".to_string()),
        (KEY_NEXT_RECORD_TIME, START.to_string()),
        (KEY_RECORD_COUNT, page_size.to_string()),
    ])
    .unwrap()
}

/// IDs of rendered records, in write order.
pub fn written_ids(lines: &[Vec<u8>]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let line = String::from_utf8_lossy(line);
            line.split(',')
                .find_map(|kv| kv.strip_prefix("sys_id=\""))
                .map(|v| v.trim_end_matches('"').to_string())
                .unwrap_or_default()
        })
        .collect()
}
