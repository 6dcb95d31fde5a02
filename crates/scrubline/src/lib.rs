#![warn(missing_docs)]

//! Scrub-schedule reconstruction from Ceph cluster dumps.
//!
//! One mixed text stream — `ceph osd tree` output, `ceph pg dump` output,
//! and per-OSD daemon log excerpts — is classified line by line and
//! cross-referenced into a chronological timeline of scrub events. Observed
//! completions become end events; start events are back-dated from each
//! deep-scrub end using a size-based duration estimate.

pub mod analyzer;
pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod pg;
pub mod report;
pub mod synth;
pub mod topology;

pub use analyzer::{ScrubCounts, ScrubLogAnalyzer};
pub use classify::{LineClassifier, LineRecord, OsdLogLine, PayloadRecord, SlowExplanation};
pub use config::{AnalyzerConfig, SCRUB_RATE_EST};
pub use error::{AnalyzeError, AnalyzeResult};
pub use event::{Boundary, EventTimeline, ScrubEvent, ScrubKind};
pub use pg::{PgStatusLine, PgTable, PlacementGroup};
pub use synth::SCRUB_INIT_USEC;
pub use topology::ClusterTopology;
