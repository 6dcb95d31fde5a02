use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, AnalyzeResult};
use crate::topology::ClusterTopology;

/// Raw fields of one `pg dump` status line, before cross-referencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgStatusLine {
    /// Placement-group identifier, e.g. `4.1f`.
    pub pgid: String,
    /// Object count.
    pub objects: u64,
    /// Byte size of the group.
    pub bytes: u64,
    /// Status token, e.g. `active+clean`.
    pub state: String,
    /// Up set, primary first.
    pub up: Vec<u32>,
    /// Separately-declared up primary.
    pub up_primary: u32,
    /// Acting set, primary first.
    pub acting: Vec<u32>,
    /// Separately-declared acting primary.
    pub acting_primary: u32,
}

/// One placement group, cross-referenced against the cluster topology.
///
/// Immutable once built; a later status line for the same id replaces the
/// whole record (last-write-wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    /// Placement-group identifier.
    pub id: String,
    /// Object count.
    pub objects: u64,
    /// Byte size of the group.
    pub bytes: u64,
    /// Status token from the dump.
    pub state: String,
    /// Up set, primary first.
    pub up: Vec<u32>,
    /// Acting set, primary first.
    pub acting: Vec<u32>,
    /// Host name of each acting-set member, in acting order.
    pub hosts: Vec<String>,
}

impl PlacementGroup {
    /// Validates a parsed status line and resolves its acting set to hosts.
    ///
    /// The separately-declared primaries must equal the first element of
    /// their sets; topology lines must have preceded the status line so
    /// every acting member resolves.
    pub fn from_status(line: PgStatusLine, topology: &ClusterTopology) -> AnalyzeResult<Self> {
        if line.up.first() != Some(&line.up_primary) {
            return Err(AnalyzeError::parse(format!(
                "pg {}: up primary {} is not the first element of up set {:?}",
                line.pgid, line.up_primary, line.up
            )));
        }
        if line.acting.first() != Some(&line.acting_primary) {
            return Err(AnalyzeError::parse(format!(
                "pg {}: acting primary {} is not the first element of acting set {:?}",
                line.pgid, line.acting_primary, line.acting
            )));
        }

        let hosts = line
            .acting
            .iter()
            .map(|&osd| topology.host_for(osd).map(str::to_string))
            .collect::<AnalyzeResult<Vec<_>>>()?;

        Ok(Self {
            id: line.pgid,
            objects: line.objects,
            bytes: line.bytes,
            state: line.state,
            up: line.up,
            acting: line.acting,
            hosts,
        })
    }

    /// Primary OSD of the acting set.
    pub fn primary(&self) -> Option<u32> {
        self.acting.first().copied()
    }
}

impl fmt::Display for PlacementGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acting: Vec<String> = self.acting.iter().map(|osd| osd.to_string()).collect();
        write!(
            f,
            "PG {:>6} ({:>6.2} GB) [{}] [{}]",
            self.id,
            self.bytes as f64 * 1e-9,
            self.hosts.join(","),
            acting.join(",")
        )
    }
}

/// Parses a comma-separated OSD set, e.g. `3,17,42`.
///
/// The empty string is the empty set, not a one-element set containing an
/// empty token.
pub fn parse_osd_set(s: &str) -> AnalyzeResult<Vec<u32>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|tok| {
            tok.parse::<u32>()
                .map_err(|_| AnalyzeError::parse(format!("bad OSD id '{}' in set '{}'", tok, s)))
        })
        .collect()
}

/// All placement groups seen so far, keyed by identifier.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PgTable {
    pgs: HashMap<String, PlacementGroup>,
}

impl PgTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a group, returning the record it replaced, if any.
    pub fn insert(&mut self, pg: PlacementGroup) -> Option<PlacementGroup> {
        self.pgs.insert(pg.id.clone(), pg)
    }

    /// Looks up a group by identifier.
    pub fn get(&self, id: &str) -> Option<&PlacementGroup> {
        self.pgs.get(id)
    }

    /// Looks up a group, failing if the status dump never declared it.
    pub fn resolve(&self, id: &str) -> AnalyzeResult<&PlacementGroup> {
        self.pgs
            .get(id)
            .ok_or_else(|| AnalyzeError::UnknownPlacementGroup {
                pgid: id.to_string(),
            })
    }

    /// Number of groups in the table.
    pub fn len(&self) -> usize {
        self.pgs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.pgs.is_empty()
    }
}
