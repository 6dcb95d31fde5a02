use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, AnalyzeResult};

/// OSD-to-host mapping built from `ceph osd tree` output.
///
/// Host lines set the "current host" context; OSD lines bind an OSD id to
/// whatever host was declared most recently. The map is built in one pass
/// and read-only afterward.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClusterTopology {
    current_host: Option<String>,
    osd_to_host: HashMap<u32, String>,
    osd_kb_used: HashMap<u32, u64>,
}

impl ClusterTopology {
    /// Creates an empty topology with no current-host context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a host's subtree: subsequent OSD lines bind to this host.
    pub fn declare_host(&mut self, host: &str) {
        self.current_host = Some(host.to_string());
    }

    /// Binds an OSD id to the current host.
    ///
    /// An OSD line before any host line is a fatal ordering error: there is
    /// no host to bind to.
    pub fn bind_osd(&mut self, osd: u32) -> AnalyzeResult<()> {
        match &self.current_host {
            Some(host) => {
                self.osd_to_host.insert(osd, host.clone());
                Ok(())
            }
            None => Err(AnalyzeError::parse(format!(
                "osd.{} declared before any host line",
                osd
            ))),
        }
    }

    /// Records per-OSD used kilobytes from a utilization line.
    pub fn record_usage(&mut self, osd: u32, kb_used: u64) {
        self.osd_kb_used.insert(osd, kb_used);
    }

    /// Resolves an OSD id to its host name.
    pub fn host_for(&self, osd: u32) -> AnalyzeResult<&str> {
        self.osd_to_host
            .get(&osd)
            .map(String::as_str)
            .ok_or(AnalyzeError::UnknownNode { osd })
    }

    /// Used kilobytes for an OSD, if a utilization line was seen.
    pub fn kb_used(&self, osd: u32) -> Option<u64> {
        self.osd_kb_used.get(&osd).copied()
    }

    /// Number of OSDs bound to a host so far.
    pub fn osd_count(&self) -> usize {
        self.osd_to_host.len()
    }
}
