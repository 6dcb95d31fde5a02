//! Line classification for the mixed input dump.
//!
//! One input stream interleaves three sources: `ceph osd tree` output,
//! `ceph pg dump` output, and per-OSD daemon log excerpts. The classifier
//! owns one precompiled pattern per recognized line shape and tries them in
//! a fixed priority order; the shapes are mutually exclusive, so the first
//! match wins. Daemon-log payloads get a second round of sub-classification
//! for scrub completions and slow-request diagnostics.

use chrono::{Duration, NaiveDateTime};
use regex::Regex;

use crate::error::{AnalyzeError, AnalyzeResult};
use crate::event::ScrubKind;
use crate::pg::{parse_osd_set, PgStatusLine};

const TSTAMP: &str = r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}";

/// One daemon-log line, header parsed, payload not yet sub-classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdLogLine {
    /// OSD that emitted the line.
    pub osd: u32,
    /// Timestamp, microsecond precision.
    pub time: NaiveDateTime,
    /// Severity/channel token, e.g. `INF` or `WRN`.
    pub severity: String,
    /// Free-text payload after the channel marker.
    pub payload: String,
}

/// Result of classifying one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRecord {
    /// A daemon-log line; payload still needs [`LineClassifier::classify_payload`].
    OsdLog(OsdLogLine),
    /// A `pg dump` status line.
    PgStatus(PgStatusLine),
    /// An `osd tree` host line: enters a host subtree.
    TreeHost {
        /// Declared host name.
        host: String,
    },
    /// An `osd tree` OSD line: binds an OSD to the current host.
    TreeOsd {
        /// Declared OSD id.
        osd: u32,
    },
    /// A per-OSD utilization line from the dump's statistics section.
    OsdStats {
        /// OSD id.
        osd: u32,
        /// Used kilobytes.
        kb_used: u64,
    },
    /// No recognized shape matched.
    Unrecognized,
}

/// Inner shape of a slow-request explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlowExplanation {
    /// A client op waiting or progressing.
    OsdOp,
    /// A replication sub-op.
    OsdSubOp,
    /// A replication sub-op reply.
    OsdSubOpReply,
    /// None of the known op shapes matched; carried for diagnostics.
    Unrecognized(String),
}

/// Result of sub-classifying a daemon-log payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadRecord {
    /// `<pgid> (scrub|deep-scrub) ok` — a scrub completion.
    ScrubOk {
        /// Placement group that finished scrubbing.
        pgid: String,
        /// Shallow or deep.
        kind: ScrubKind,
    },
    /// `slow request ... received at <ts>: <explanation>` — never an event.
    SlowRequest {
        /// Age of the request in seconds when logged.
        age_secs: f64,
        /// When the slow request was originally received.
        received: NaiveDateTime,
        /// Parsed inner shape.
        explanation: SlowExplanation,
    },
    /// `<n> slow requests, <m> included below; ...` — absorbed.
    SlowSummary,
}

/// Classifier holding every pattern, compiled once at construction.
#[derive(Debug)]
pub struct LineClassifier {
    osd_log: Regex,
    pg_status: Regex,
    tree_host: Regex,
    tree_osd: Regex,
    osd_stats: Regex,
    scrub_ok: Regex,
    slow_request: Regex,
    slow_osd_op: Regex,
    slow_sub_op: Regex,
    slow_sub_op_reply: Regex,
    slow_summary: Regex,
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("line pattern must compile")
}

fn parse_num<T>(s: &str, what: &str) -> AnalyzeResult<T>
where
    T: std::str::FromStr,
{
    s.parse::<T>()
        .map_err(|_| AnalyzeError::parse(format!("bad {} '{}'", what, s)))
}

/// Parses a `YYYY-MM-DD HH:MM:SS` base plus a microsecond suffix.
pub fn parse_timestamp(ymdhms: &str, usec: &str) -> AnalyzeResult<NaiveDateTime> {
    let base = NaiveDateTime::parse_from_str(ymdhms, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| AnalyzeError::parse(format!("bad timestamp '{}': {}", ymdhms, e)))?;
    let micros: i64 = parse_num(usec, "microsecond field")?;
    Ok(base + Duration::microseconds(micros))
}

impl LineClassifier {
    /// Compiles the full pattern set.
    pub fn new() -> Self {
        Self {
            osd_log: pattern(&format!(
                r"^ */var/log/ceph/ceph-osd\.(?P<osd>\d+)\.log(?:\.\d+(?:\.gz)?)?:(?P<ts>{TS})\.(?P<usec>\d+)\s+(?P<hex>[0-9a-f]+)\s+0 log \[(?P<sev>[^\]]*)\] : (?P<payload>.*)$",
                TS = TSTAMP
            )),
            pg_status: pattern(&format!(
                r"^(?P<pgid>[0-9a-f]+\.[0-9a-f]+)\t\d+\t\d+\t\d+\t(?P<objects>\d+)\t(?P<bytes>\d+)\t\d+\t\d+\t(?P<state>\S+)\t{TS}\.\d+\t\d+'\d+\t\d+:\d+\t\[(?P<up>[0-9,]*)\]\t(?P<up_primary>\d+)\t\[(?P<acting>[0-9,]*)\]\t(?P<acting_primary>\d+)\t\d+'\d+\t{TS}\.\d+\t\d+'\d+\t{TS}\.\d+$",
                TS = TSTAMP
            )),
            tree_host: pattern(r"^-\d+\t\d+\.\d+\t\thost (?P<host>.*)$"),
            tree_osd: pattern(r"^(?P<osd>\d+)\t\d+\.\d+\t\t\tosd\.\d+\tup\t1\t$"),
            osd_stats: pattern(
                r"^(?P<osd>\d+)\t(?P<kb_used>\d+)\t\d+\t\d+\t\[[0-9,]*\]\t\[[0-9,]*\]$",
            ),
            scrub_ok: pattern(r"^(?P<pgid>.*) (?P<kind>deep-scrub|scrub) ok$"),
            slow_request: pattern(&format!(
                r"^slow request (?P<age>[0-9.]+) seconds old, received at (?P<ts>{TS})\.(?P<usec>\d+): (?P<explanation>.*)$",
                TS = TSTAMP
            )),
            slow_osd_op: pattern(
                r"^osd_op\(.*\) v4 currently (?:waiting for (?:subops from [0-9,]+|scrub|degraded object)|started|reached pg|no flag points reached|commit sent)",
            ),
            slow_sub_op: pattern(
                r"^osd_sub_op\(.*\) v11 currently (?:commit sent|no flag points reached|started)",
            ),
            slow_sub_op_reply: pattern(r"^osd_sub_op_reply\(.*\) v2 currently no flag points reached"),
            slow_summary: pattern(
                r"^\d+ slow requests, \d+ included below; oldest blocked for > [0-9.]+ secs",
            ),
        }
    }

    /// Tries every line shape in priority order and parses the first match.
    ///
    /// Returns [`LineRecord::Unrecognized`] when nothing matches; that is
    /// not an error at this layer.
    pub fn classify(&self, line: &str) -> AnalyzeResult<LineRecord> {
        if let Some(caps) = self.osd_log.captures(line) {
            return Ok(LineRecord::OsdLog(OsdLogLine {
                osd: parse_num(&caps["osd"], "OSD id")?,
                time: parse_timestamp(&caps["ts"], &caps["usec"])?,
                severity: caps["sev"].to_string(),
                payload: caps["payload"].to_string(),
            }));
        }
        if let Some(caps) = self.pg_status.captures(line) {
            return Ok(LineRecord::PgStatus(PgStatusLine {
                pgid: caps["pgid"].to_string(),
                objects: parse_num(&caps["objects"], "object count")?,
                bytes: parse_num(&caps["bytes"], "byte count")?,
                state: caps["state"].to_string(),
                up: parse_osd_set(&caps["up"])?,
                up_primary: parse_num(&caps["up_primary"], "up primary")?,
                acting: parse_osd_set(&caps["acting"])?,
                acting_primary: parse_num(&caps["acting_primary"], "acting primary")?,
            }));
        }
        if let Some(caps) = self.tree_host.captures(line) {
            return Ok(LineRecord::TreeHost {
                host: caps["host"].to_string(),
            });
        }
        if let Some(caps) = self.tree_osd.captures(line) {
            return Ok(LineRecord::TreeOsd {
                osd: parse_num(&caps["osd"], "OSD id")?,
            });
        }
        if let Some(caps) = self.osd_stats.captures(line) {
            return Ok(LineRecord::OsdStats {
                osd: parse_num(&caps["osd"], "OSD id")?,
                kb_used: parse_num(&caps["kb_used"], "used-kilobyte count")?,
            });
        }
        Ok(LineRecord::Unrecognized)
    }

    /// Sub-classifies a daemon-log payload.
    ///
    /// Unlike whole-line classification, a payload matching no shape is a
    /// fatal parse error: the line already identified itself as a daemon-log
    /// line, so an unknown payload means an unhandled log form.
    pub fn classify_payload(&self, payload: &str) -> AnalyzeResult<PayloadRecord> {
        if let Some(caps) = self.scrub_ok.captures(payload) {
            return Ok(PayloadRecord::ScrubOk {
                pgid: caps["pgid"].to_string(),
                kind: ScrubKind::parse(&caps["kind"])?,
            });
        }
        if let Some(caps) = self.slow_request.captures(payload) {
            let explanation = &caps["explanation"];
            let explanation = if self.slow_osd_op.is_match(explanation) {
                SlowExplanation::OsdOp
            } else if self.slow_sub_op.is_match(explanation) {
                SlowExplanation::OsdSubOp
            } else if self.slow_sub_op_reply.is_match(explanation) {
                SlowExplanation::OsdSubOpReply
            } else {
                SlowExplanation::Unrecognized(explanation.to_string())
            };
            return Ok(PayloadRecord::SlowRequest {
                age_secs: parse_num(&caps["age"], "request age")?,
                received: parse_timestamp(&caps["ts"], &caps["usec"])?,
                explanation,
            });
        }
        if self.slow_summary.is_match(payload) {
            return Ok(PayloadRecord::SlowSummary);
        }
        Err(AnalyzeError::parse(format!(
            "unrecognized OSD log payload: \"{}\"",
            payload
        )))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
