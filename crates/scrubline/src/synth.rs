//! Start-event synthesis for deep scrubs.
//!
//! The daemon logs only record scrub completions. For every deep-scrub end
//! event, a start event is back-dated by an estimated duration derived from
//! the placement group's byte size and an assumed scrub throughput.

use chrono::Duration;
use tracing::info;

use crate::error::AnalyzeResult;
use crate::event::{Boundary, EventTimeline, ScrubEvent, ScrubKind};
use crate::pg::PgTable;

/// Fixed duration floor in microseconds, so a zero-byte group still gets a
/// nonzero scrub duration.
pub const SCRUB_INIT_USEC: i64 = 1;

/// Estimated deep-scrub duration for a group of `bytes` bytes at
/// `rate_bytes_per_sec` throughput.
pub fn estimated_duration(bytes: u64, rate_bytes_per_sec: f64) -> Duration {
    let usec = (bytes as f64 / (rate_bytes_per_sec / 1e6)) as i64 + SCRUB_INIT_USEC;
    Duration::microseconds(usec)
}

/// Inserts a start event for every deep-scrub end event on the timeline.
///
/// The end events are snapshotted before the first insertion: the timeline
/// is never mutated while it is being traversed. Shallow scrubs carry no
/// sizing data and are left untouched.
pub fn add_start_events(
    timeline: &mut EventTimeline,
    pgs: &PgTable,
    rate_bytes_per_sec: f64,
) -> AnalyzeResult<()> {
    let deep_ends: Vec<ScrubEvent> = timeline
        .iter()
        .filter(|event| event.kind == ScrubKind::Deep && event.boundary == Boundary::End)
        .cloned()
        .collect();

    let synthesized = deep_ends.len();
    for end in deep_ends {
        let pg = pgs.resolve(&end.pg_id)?;
        let start_time = end.time - estimated_duration(pg.bytes, rate_bytes_per_sec);
        timeline.insert(ScrubEvent {
            time: start_time,
            kind: end.kind,
            boundary: Boundary::Start,
            pg_id: end.pg_id,
        })?;
    }

    info!(
        start_events = synthesized,
        "synthesized scrub start events"
    );
    Ok(())
}
