//! Union of two event sequences keyed by `(kind, timestamp)`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::core::events::{Event, EventKind};

/// Identity used to deduplicate events across processes.
pub type MergeKey = (EventKind, DateTime<Utc>);

pub fn merge_key(event: &Event) -> MergeKey {
    (event.kind(), event.timestamp)
}

/// Keep every event in `existing` (in order), then append each event from
/// `local` whose key has not been seen yet.
///
/// At-least-once: two distinct events sharing kind and timestamp collapse to
/// whichever was seen first.
pub fn merge_events(existing: &[Event], local: &[Event]) -> Vec<Event> {
    let mut seen: HashSet<MergeKey> = existing.iter().map(merge_key).collect();
    let mut merged = existing.to_vec();
    for event in local {
        if seen.insert(merge_key(event)) {
            merged.push(event.clone());
        }
    }
    merged
}
