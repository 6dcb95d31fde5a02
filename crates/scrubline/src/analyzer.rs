//! Single-pass driver for the scrub-log analysis pipeline.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{LineClassifier, LineRecord, OsdLogLine, PayloadRecord, SlowExplanation};
use crate::config::AnalyzerConfig;
use crate::error::AnalyzeResult;
use crate::event::{Boundary, EventTimeline, ScrubEvent, ScrubKind};
use crate::pg::{PgTable, PlacementGroup};
use crate::report;
use crate::synth;
use crate::topology::ClusterTopology;

/// Scrub completion counters, kept across the whole log pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubCounts {
    /// All scrub completions, shallow and deep.
    pub total: u64,
    /// Shallow completions.
    pub shallow: u64,
    /// Deep completions.
    pub deep: u64,
}

/// Reconstructs a scrub timeline from a mixed cluster dump.
///
/// State is mutated in a strict phase order within the single input pass:
/// topology lines populate the OSD map, status lines populate the group
/// table (resolving hosts against the topology built so far), and daemon-log
/// lines append end events. Start-event synthesis runs only after the pass
/// completes.
#[derive(Debug)]
pub struct ScrubLogAnalyzer {
    config: AnalyzerConfig,
    classifier: LineClassifier,
    topology: ClusterTopology,
    pgs: PgTable,
    timeline: EventTimeline,
    counts: ScrubCounts,
}

impl ScrubLogAnalyzer {
    /// Creates an analyzer with empty state and precompiled patterns.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            classifier: LineClassifier::new(),
            topology: ClusterTopology::new(),
            pgs: PgTable::new(),
            timeline: EventTimeline::new(),
            counts: ScrubCounts::default(),
        }
    }

    /// Classifies and applies one input line.
    pub fn parse_line(&mut self, line: &str) -> AnalyzeResult<()> {
        match self.classifier.classify(line)? {
            LineRecord::OsdLog(log) => self.handle_osd_log(log),
            LineRecord::PgStatus(status) => {
                let pg = PlacementGroup::from_status(status, &self.topology)?;
                if let Some(previous) = self.pgs.insert(pg) {
                    debug!(pgid = %previous.id, "replaced placement-group record");
                }
                Ok(())
            }
            LineRecord::TreeHost { host } => {
                self.topology.declare_host(&host);
                Ok(())
            }
            LineRecord::TreeOsd { osd } => self.topology.bind_osd(osd),
            LineRecord::OsdStats { osd, kb_used } => {
                self.topology.record_usage(osd, kb_used);
                Ok(())
            }
            LineRecord::Unrecognized => {
                if self.config.log_unknown_lines {
                    warn!(line = line, "unrecognized input line");
                }
                Ok(())
            }
        }
    }

    fn handle_osd_log(&mut self, log: OsdLogLine) -> AnalyzeResult<()> {
        // The line matched the daemon-log shape either way; at or before the
        // cutoff it is absorbed without touching counters or the timeline.
        if let Some(min_time) = self.config.min_time {
            if log.time <= min_time {
                return Ok(());
            }
        }

        match self.classifier.classify_payload(&log.payload)? {
            PayloadRecord::ScrubOk { pgid, kind } => {
                self.counts.total += 1;
                match kind {
                    ScrubKind::Shallow => {
                        self.counts.shallow += 1;
                    }
                    ScrubKind::Deep => {
                        self.counts.deep += 1;
                        self.pgs.resolve(&pgid)?;
                        self.timeline.insert(ScrubEvent {
                            time: log.time,
                            kind,
                            boundary: Boundary::End,
                            pg_id: pgid,
                        })?;
                    }
                }
                Ok(())
            }
            PayloadRecord::SlowRequest {
                age_secs,
                received,
                explanation,
            } => {
                if let SlowExplanation::Unrecognized(explanation) = explanation {
                    let host = self.topology.host_for(log.osd).unwrap_or("unknown");
                    warn!(
                        osd = log.osd,
                        host = host,
                        age_secs = age_secs,
                        received = %received,
                        explanation = %explanation,
                        "slow request with unrecognized explanation"
                    );
                }
                Ok(())
            }
            PayloadRecord::SlowSummary => Ok(()),
        }
    }

    /// Drives a reader to completion, one line at a time.
    pub fn parse_reader<R: BufRead>(&mut self, reader: R) -> AnalyzeResult<()> {
        for line in reader.lines() {
            let line = line?;
            self.parse_line(&line)?;
        }
        info!(
            scrubs = self.counts.total,
            shallow = self.counts.shallow,
            deep = self.counts.deep,
            pgs = self.pgs.len(),
            osds = self.topology.osd_count(),
            "input pass complete"
        );
        Ok(())
    }

    /// Runs start-event synthesis over the completed timeline.
    pub fn finish(&mut self) -> AnalyzeResult<()> {
        synth::add_start_events(
            &mut self.timeline,
            &self.pgs,
            self.config.scrub_rate_bytes_per_sec,
        )
    }

    /// Renders the summary line and the ordered event log.
    pub fn write_report<W: Write>(&self, out: &mut W) -> AnalyzeResult<()> {
        report::write_report(out, &self.timeline, &self.pgs, &self.counts)
    }

    /// Full pipeline: parse, synthesize, report.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: R, out: &mut W) -> AnalyzeResult<()> {
        self.parse_reader(reader)?;
        self.finish()?;
        self.write_report(out)
    }

    /// Completion counters observed so far.
    pub fn counts(&self) -> &ScrubCounts {
        &self.counts
    }

    /// The event timeline in its current state.
    pub fn timeline(&self) -> &EventTimeline {
        &self.timeline
    }

    /// The placement-group table in its current state.
    pub fn pgs(&self) -> &PgTable {
        &self.pgs
    }

    /// The OSD topology in its current state.
    pub fn topology(&self) -> &ClusterTopology {
        &self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzeError;
    use chrono::NaiveDate;
    use std::io::Cursor;

    const HOST_LINE: &str = "-2\t5.46\t\thost nodeA";
    const OSD_LINE: &str = "3\t1.82\t\t\tosd.3\tup\t1\t";

    fn pg_line(pgid: &str, bytes: u64, set: &str, primary: u32) -> String {
        format!(
            "{}\t0\t0\t0\t244\t{}\t3000\t3000\tactive+clean\t2015-04-01 12:00:00.000000\t1234'5678\t100:200\t[{set}]\t{p}\t[{set}]\t{p}\t1234'5678\t2015-04-01 11:00:00.000000\t1234'5678\t2015-03-30 10:00:00.000000",
            pgid,
            bytes,
            set = set,
            p = primary
        )
    }

    fn log_line(osd: u32, stamp: &str, payload: &str) -> String {
        format!(
            "/var/log/ceph/ceph-osd.{}.log:{} abc123 0 log [INF] : {}",
            osd, stamp, payload
        )
    }

    fn default_analyzer() -> ScrubLogAnalyzer {
        ScrubLogAnalyzer::new(AnalyzerConfig::default())
    }

    fn run_to_string(analyzer: &mut ScrubLogAnalyzer, input: &str) -> String {
        let mut out = Vec::new();
        analyzer.run(Cursor::new(input.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_end_to_end_single_deep_scrub() {
        let input = format!(
            "{}\n{}\n{}\n{}\n",
            HOST_LINE,
            OSD_LINE,
            pg_line("1.a", 1_000_000_000, "3", 3),
            log_line(3, "2015-04-02 10:00:00.000000", "1.a deep-scrub ok")
        );

        let mut analyzer = default_analyzer();
        let output = run_to_string(&mut analyzer, &input);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Found 1 scrubs, 1 deep");
        assert_eq!(
            lines[1],
            "2015-04-02 09:59:47.499999 <D PG    1.a (  1.00 GB) [nodeA] [3]"
        );
        assert_eq!(
            lines[2],
            "2015-04-02 10:00:00.000000 >D PG    1.a (  1.00 GB) [nodeA] [3]"
        );
    }

    #[test]
    fn test_shallow_scrub_counted_but_no_event() {
        let input = format!(
            "{}\n{}\n{}\n{}\n",
            HOST_LINE,
            OSD_LINE,
            pg_line("1.a", 1_000_000_000, "3", 3),
            log_line(3, "2015-04-02 10:00:00.000000", "1.a scrub ok")
        );

        let mut analyzer = default_analyzer();
        let output = run_to_string(&mut analyzer, &input);

        assert_eq!(output, "Found 1 scrubs, 0 deep\n");
        assert_eq!(analyzer.counts().shallow, 1);
        assert!(analyzer.timeline().is_empty());
    }

    #[test]
    fn test_min_time_cutoff_suppresses_counting() {
        let mut config = AnalyzerConfig::default();
        config.min_time = Some(
            NaiveDate::from_ymd_opt(2015, 4, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let mut analyzer = ScrubLogAnalyzer::new(config);

        let input = format!(
            "{}\n{}\n{}\n{}\n{}\n",
            HOST_LINE,
            OSD_LINE,
            pg_line("1.a", 1_000_000_000, "3", 3),
            // At the cutoff exactly: ignored (strictly-after rule).
            log_line(3, "2015-04-01 00:00:00.000000", "1.a deep-scrub ok"),
            // Before the cutoff: ignored.
            log_line(3, "2015-03-28 09:00:00.000000", "1.a scrub ok")
        );

        let output = run_to_string(&mut analyzer, &input);
        assert_eq!(output, "Found 0 scrubs, 0 deep\n");
        assert_eq!(analyzer.counts(), &ScrubCounts::default());
    }

    #[test]
    fn test_cutoff_line_with_garbage_payload_is_absorbed() {
        let mut config = AnalyzerConfig::default();
        config.min_time = Some(
            NaiveDate::from_ymd_opt(2015, 4, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let mut analyzer = ScrubLogAnalyzer::new(config);

        // Payload would be a fatal parse error, but the cutoff absorbs the
        // line before payload classification.
        let line = log_line(3, "2015-03-01 00:00:00.000000", "journal flush took 3s");
        analyzer.parse_line(&line).unwrap();
    }

    #[test]
    fn test_unknown_payload_after_cutoff_is_fatal() {
        let mut analyzer = default_analyzer();
        let line = log_line(3, "2015-04-02 10:00:00.000000", "journal flush took 3s");
        let err = analyzer.parse_line(&line).unwrap_err();
        assert!(matches!(err, AnalyzeError::Parse { .. }));
    }

    #[test]
    fn test_deep_scrub_for_undeclared_pg_is_fatal() {
        let mut analyzer = default_analyzer();
        let line = log_line(3, "2015-04-02 10:00:00.000000", "9.ff deep-scrub ok");
        let err = analyzer.parse_line(&line).unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::UnknownPlacementGroup { .. }
        ));
    }

    #[test]
    fn test_status_line_before_topology_is_fatal() {
        let mut analyzer = default_analyzer();
        let err = analyzer
            .parse_line(&pg_line("1.a", 1_000_000_000, "3", 3))
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::UnknownNode { osd: 3 }));
    }

    #[test]
    fn test_osd_line_before_host_is_fatal() {
        let mut analyzer = default_analyzer();
        let err = analyzer.parse_line(OSD_LINE).unwrap_err();
        assert!(matches!(err, AnalyzeError::Parse { .. }));
    }

    #[test]
    fn test_primary_mismatch_is_fatal() {
        let mut analyzer = default_analyzer();
        analyzer.parse_line(HOST_LINE).unwrap();
        analyzer.parse_line(OSD_LINE).unwrap();
        analyzer.parse_line("17\t1.82\t\t\tosd.17\tup\t1\t").unwrap();

        let bad = pg_line("1.a", 1_000_000_000, "3,17", 17);
        let err = analyzer.parse_line(&bad).unwrap_err();
        assert!(matches!(err, AnalyzeError::Parse { .. }));
    }

    #[test]
    fn test_restatus_overwrites_and_lookups_see_newest() {
        let input = format!(
            "{}\n{}\n{}\n{}\n{}\n",
            HOST_LINE,
            OSD_LINE,
            pg_line("1.a", 1_000_000_000, "3", 3),
            pg_line("1.a", 4_000_000_000, "3", 3),
            log_line(3, "2015-04-02 10:00:00.000000", "1.a deep-scrub ok")
        );

        let mut analyzer = default_analyzer();
        let output = run_to_string(&mut analyzer, &input);

        assert_eq!(analyzer.pgs().len(), 1);
        assert_eq!(analyzer.pgs().get("1.a").unwrap().bytes, 4_000_000_000);
        // 4 GB at 80 MB/s: 50 s + 1 usec before the end event.
        assert!(output.contains("2015-04-02 09:59:09.999999 <D"));
        assert!(output.contains("(  4.00 GB)"));
    }

    #[test]
    fn test_duplicate_event_timestamp_is_fatal() {
        let mut analyzer = default_analyzer();
        analyzer.parse_line(HOST_LINE).unwrap();
        analyzer.parse_line(OSD_LINE).unwrap();
        analyzer
            .parse_line(&pg_line("1.a", 1_000_000_000, "3", 3))
            .unwrap();
        analyzer
            .parse_line(&pg_line("1.b", 1_000_000_000, "3", 3))
            .unwrap();

        let stamp = "2015-04-02 10:00:00.000000";
        analyzer
            .parse_line(&log_line(3, stamp, "1.a deep-scrub ok"))
            .unwrap();
        let err = analyzer
            .parse_line(&log_line(3, stamp, "1.b deep-scrub ok"))
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::DuplicateTimestamp { .. }));
    }

    #[test]
    fn test_unrecognized_lines_are_skipped() {
        let mut analyzer = default_analyzer();
        analyzer.parse_line("dumped all in format plain").unwrap();
        analyzer.parse_line("").unwrap();
        assert_eq!(analyzer.counts(), &ScrubCounts::default());
        assert!(analyzer.timeline().is_empty());
    }

    #[test]
    fn test_slow_request_lines_produce_no_events() {
        let input = format!(
            "{}\n{}\n{}\n{}\n{}\n",
            HOST_LINE,
            OSD_LINE,
            pg_line("1.a", 1_000_000_000, "3", 3),
            log_line(
                3,
                "2015-04-02 10:00:00.000000",
                "4 slow requests, 1 included below; oldest blocked for > 61.1 secs"
            ),
            log_line(
                3,
                "2015-04-02 10:00:00.000001",
                "slow request 61.1 seconds old, received at 2015-04-02 09:59:00.000000: osd_op(client.1 foo) v4 currently commit sent"
            )
        );

        let mut analyzer = default_analyzer();
        let output = run_to_string(&mut analyzer, &input);
        assert_eq!(output, "Found 0 scrubs, 0 deep\n");
        assert!(analyzer.timeline().is_empty());
    }

    #[test]
    fn test_osd_stats_line_recorded() {
        let mut analyzer = default_analyzer();
        analyzer
            .parse_line("3\t104857600\t830472192\t935329792\t[0,1]\t[2]")
            .unwrap();
        assert_eq!(analyzer.topology().kb_used(3), Some(104_857_600));
    }
}
