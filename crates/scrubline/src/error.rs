//! Error types for the scrub-log analysis pipeline.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Result type alias for analysis operations.
pub type AnalyzeResult<T> = Result<T, AnalyzeError>;

/// Error variants for the scrub-log analysis pipeline.
///
/// The analysis is a single-pass offline batch: the first error aborts the
/// run. Lines that match no recognized shape at all are not errors; they are
/// skipped or warned about depending on configuration.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Wraps standard I/O errors while reading the input dump.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line or payload violated an expected shape or invariant.
    #[error("Parse error: {msg}")]
    Parse {
        /// Description of the offending input.
        msg: String,
    },

    /// Two events landed on the exact same timestamp.
    #[error("Duplicate event timestamp: {time}")]
    DuplicateTimestamp {
        /// The contested timestamp.
        time: NaiveDateTime,
    },

    /// An OSD id was referenced that no topology host line declared.
    #[error("Unknown OSD id {osd}: not bound to any host")]
    UnknownNode {
        /// The unresolved OSD id.
        osd: u32,
    },

    /// A log event referenced a placement group absent from the status dump.
    #[error("Unknown placement group: {pgid}")]
    UnknownPlacementGroup {
        /// The unresolved placement-group id.
        pgid: String,
    },
}

impl AnalyzeError {
    /// Builds a `Parse` error from anything message-like.
    pub fn parse(msg: impl Into<String>) -> Self {
        AnalyzeError::Parse { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_analyze_result_alias() {
        let ok: AnalyzeResult<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: AnalyzeResult<i32> = Err(AnalyzeError::parse("bad line"));
        assert!(err.is_err());
    }

    #[test]
    fn test_io_error_from_std() {
        let std_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = AnalyzeError::from(std_err);
        assert!(matches!(err, AnalyzeError::Io(_)));
    }

    #[test]
    fn test_parse_error_message() {
        let err = AnalyzeError::parse("osd.7 declared before any host line");
        assert_eq!(
            format!("{}", err),
            "Parse error: osd.7 declared before any host line"
        );
    }

    #[test]
    fn test_duplicate_timestamp_message() {
        let time = NaiveDate::from_ymd_opt(2015, 4, 2)
            .unwrap()
            .and_hms_micro_opt(10, 0, 0, 17)
            .unwrap();
        let err = AnalyzeError::DuplicateTimestamp { time };
        let msg = format!("{}", err);
        assert!(msg.contains("Duplicate event timestamp"));
        assert!(msg.contains("2015-04-02 10:00:00.000017"));
    }

    #[test]
    fn test_unknown_node_message() {
        let err = AnalyzeError::UnknownNode { osd: 12 };
        assert_eq!(format!("{}", err), "Unknown OSD id 12: not bound to any host");
    }

    #[test]
    fn test_unknown_placement_group_message() {
        let err = AnalyzeError::UnknownPlacementGroup {
            pgid: "4.1f".to_string(),
        };
        assert_eq!(format!("{}", err), "Unknown placement group: 4.1f");
    }
}
