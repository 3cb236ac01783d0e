use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::inspect::error::{InspectError, Result};

/// Reads and decodes a JSON snapshot file.
///
/// # Errors
///
/// Returns [`InspectError::MissingSnapshot`] when the file does not exist and
/// [`InspectError::Json`] when its contents do not decode as `T`.
pub fn load_snapshot<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(InspectError::missing_snapshot(path));
    }
    let text = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = text.len(), "loaded snapshot");
    serde_json::from_str(&text).map_err(|err| InspectError::json(path.display().to_string(), err))
}

/// Decodes a JSON snapshot held in memory.
pub fn parse_snapshot<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|err| InspectError::json("<inline>", err))
}

/// Percentage of `part` in `whole`, zero when `whole` is zero.
pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Narrows a producer count to `u32`, clamping negatives to zero.
pub(crate) fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::snapshot::IndexStatsRecord;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_reported_by_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_snapshot::<IndexStatsRecord>(&path).unwrap_err();
        assert!(matches!(err, InspectError::MissingSnapshot(ref p) if p == &path));
    }

    #[test]
    fn malformed_json_names_its_origin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_snapshot::<IndexStatsRecord>(&path).unwrap_err();
        assert!(matches!(err, InspectError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn parses_inline_text() {
        let stats: IndexStatsRecord = parse_snapshot(r#"{"leafPages": 12}"#).unwrap();
        assert_eq!(stats.leaf_pages, 12);
        let err = parse_snapshot::<IndexStatsRecord>("42").unwrap_err();
        assert!(matches!(err, InspectError::Json { ref origin, .. } if origin == "<inline>"));
        assert!(parse_snapshot::<IndexStatsRecord>(r#""stats""#).is_err());
    }

    #[test]
    fn helpers_handle_degenerate_input() {
        assert_eq!(percent(1.0, 0.0), 0.0);
        assert_eq!(percent(1.0, 4.0), 25.0);
        assert_eq!(clamp_count(-1), 0);
        assert_eq!(clamp_count(i64::MAX), u32::MAX);
    }
}
