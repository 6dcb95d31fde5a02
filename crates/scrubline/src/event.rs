//! Scrub events and the time-ordered event timeline.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, AnalyzeResult};

/// Which integrity pass a scrub event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrubKind {
    /// Metadata-only check.
    Shallow,
    /// Full data-content check.
    Deep,
}

impl ScrubKind {
    /// Parses the scrub-type token from a completion payload.
    pub fn parse(token: &str) -> AnalyzeResult<Self> {
        match token {
            "scrub" => Ok(ScrubKind::Shallow),
            "deep-scrub" => Ok(ScrubKind::Deep),
            other => Err(AnalyzeError::parse(format!(
                "unknown scrub type '{}'",
                other
            ))),
        }
    }

    /// Single-character rendering: `D` for deep, `S` for shallow.
    pub fn marker(&self) -> char {
        match self {
            ScrubKind::Shallow => 'S',
            ScrubKind::Deep => 'D',
        }
    }
}

/// Whether an event marks the start or the end of a scrub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    /// Inferred beginning of a scrub.
    Start,
    /// Observed completion of a scrub.
    End,
}

impl Boundary {
    /// Single-character rendering: `<` for start, `>` for end.
    pub fn marker(&self) -> char {
        match self {
            Boundary::Start => '<',
            Boundary::End => '>',
        }
    }
}

/// One scrub event on the timeline.
///
/// The placement group is referenced by identifier, not copied: lookups at
/// synthesis and report time go through the live table and therefore observe
/// the most recent record for that id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubEvent {
    /// When the event occurred (microsecond precision, no timezone).
    pub time: NaiveDateTime,
    /// Shallow or deep.
    pub kind: ScrubKind,
    /// Start or end.
    pub boundary: Boundary,
    /// Identifier of the placement group being scrubbed.
    pub pg_id: String,
}

/// Events keyed by timestamp, traversed in ascending time order.
///
/// Exactly one event may occupy a timestamp; a second insertion at the same
/// instant is a fatal error rather than a silent merge.
#[derive(Debug, Default)]
pub struct EventTimeline {
    events: BTreeMap<NaiveDateTime, ScrubEvent>,
}

impl EventTimeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event, rejecting a duplicate timestamp.
    pub fn insert(&mut self, event: ScrubEvent) -> AnalyzeResult<()> {
        match self.events.entry(event.time) {
            Entry::Occupied(_) => Err(AnalyzeError::DuplicateTimestamp { time: event.time }),
            Entry::Vacant(slot) => {
                slot.insert(event);
                Ok(())
            }
        }
    }

    /// Ascending-by-timestamp traversal. Each call starts a fresh view.
    pub fn iter(&self) -> impl Iterator<Item = &ScrubEvent> {
        self.events.values()
    }

    /// Number of events on the timeline.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the timeline holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
