//! Cursor reconciliation.
//!
//! Source timestamps have one-second resolution and a page holds a bounded number
//! of records, so a page boundary can split the records of one timestamp. The
//! checkpoint therefore remembers the IDs already emitted at the cursor timestamp,
//! and the next page (fetched with `timestamp >= cursor`) is filtered against them.
//!
//! Everything here is pure; the caller owns fetching and persisting.

mod error;
pub use error::CursorError;

use std::collections::HashSet;

use harvest_model::{CollectionState, Page, Record};
use time::{Duration, PrimitiveDateTime, macros::format_description};
use tracing::{info, warn};

/// Human form of the source timestamp template.
pub const TIME_TEMPLATE: &str = "YYYY-MM-DD hh:mm:ss";

/// Outcome of reconciling one page against the previous checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Records safe to emit, in page order.
    pub emit: Vec<Record>,
    /// Checkpoint to commit once `emit` was written; `None` leaves it unchanged.
    pub checkpoint: Option<CollectionState>,
    /// The cursor was forced past a saturated timestamp.
    ///
    /// The checkpoint then applies to the in-memory state right away.
    pub refreshed: bool,
}

/// Reconcile a freshly fetched page with the previous checkpoint.
pub fn reconcile(
    previous: Option<&CollectionState>,
    page: &Page,
    page_size: usize,
) -> Result<Reconciled, CursorError> {
    let records = page.records();

    let boundary = previous.filter(|state| state.has_boundary() && !page.is_empty());
    let Some(previous) = boundary else {
        return Ok(Reconciled {
            emit: records.to_vec(),
            checkpoint: checkpoint_after(records),
            refreshed: false,
        });
    };

    let emit = drop_committed(records, previous);

    if let Some(timestamp) = saturated_timestamp(page, page_size) {
        warn!(
            page_size,
            timestamp, "a full page shares one timestamp, forcing the cursor forward"
        );
        let next = next_second(timestamp)?;
        warn!(next_record_time = %next, "cursor advanced");
        return Ok(Reconciled {
            emit,
            checkpoint: Some(CollectionState::initial(next)),
            refreshed: true,
        });
    }

    let checkpoint = if emit.is_empty() {
        None
    } else {
        checkpoint_after(records)
    };
    Ok(Reconciled {
        emit,
        checkpoint,
        refreshed: false,
    })
}

fn drop_committed(records: &[Record], previous: &CollectionState) -> Vec<Record> {
    let committed: HashSet<&str> = previous
        .last_time_records
        .iter()
        .map(String::as_str)
        .collect();

    let mut removed = Vec::new();
    let kept = records
        .iter()
        .filter(|r| {
            let seen = r.timestamp() == previous.next_record_time && committed.contains(r.id());
            if seen {
                removed.push(r.id());
            }
            !seen
        })
        .cloned()
        .collect();

    if !removed.is_empty() {
        info!(
            timestamp = %previous.next_record_time,
            last_time_records = ?previous.last_time_records,
            removed = ?removed,
            "removed records collected at the same timestamp"
        );
    }
    kept
}

/// Shared timestamp of a full page whose first and last records tie.
fn saturated_timestamp(page: &Page, page_size: usize) -> Option<&str> {
    if page_size == 0 || page.fetched() != page_size {
        return None;
    }
    let records = page.records();
    let (first, last) = (records.first()?, records.last()?);
    (first.timestamp() == last.timestamp()).then(|| first.timestamp())
}

/// Checkpoint after emitting `records`: the last timestamp and every ID sharing it.
fn checkpoint_after(records: &[Record]) -> Option<CollectionState> {
    let last = records.last()?;
    let ids = records
        .iter()
        .rev()
        .take_while(|r| r.timestamp() == last.timestamp())
        .map(|r| r.id().to_string())
        .collect();
    Some(CollectionState::new(last.timestamp(), ids))
}

/// `timestamp` plus one second, in the source template.
pub fn next_second(timestamp: &str) -> Result<String, CursorError> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let parsed =
        PrimitiveDateTime::parse(timestamp, format).map_err(|source| CursorError::Parse {
            value: timestamp.to_string(),
            source,
        })?;
    let next = parsed
        .checked_add(Duration::SECOND)
        .ok_or_else(|| CursorError::Overflow(timestamp.to_string()))?;
    Ok(next.format(format)?)
}
