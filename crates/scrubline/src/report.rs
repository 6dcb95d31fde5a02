use std::io::Write;

use crate::analyzer::ScrubCounts;
use crate::error::AnalyzeResult;
use crate::event::EventTimeline;
use crate::pg::PgTable;

/// Writes the summary line and one line per event, in ascending time order.
///
/// Rendering is presentation only: `<`/`>` mark start/end, `D`/`S` mark
/// deep/shallow, sizes print in gigabytes at fixed precision. Placement
/// groups are looked up in the live table, so each line reflects the most
/// recent record for its id.
pub fn write_report<W: Write>(
    out: &mut W,
    timeline: &EventTimeline,
    pgs: &PgTable,
    counts: &ScrubCounts,
) -> AnalyzeResult<()> {
    writeln!(out, "Found {} scrubs, {} deep", counts.total, counts.deep)?;
    for event in timeline.iter() {
        let pg = pgs.resolve(&event.pg_id)?;
        writeln!(
            out,
            "{} {}{} {}",
            event.time.format("%Y-%m-%d %H:%M:%S%.6f"),
            event.boundary.marker(),
            event.kind.marker(),
            pg
        )?;
    }
    Ok(())
}
