//! Recorded fix logs: GPX tracks and JSON-lines dumps.
//!
//! Both formats produce the same `Vec<Fix>` so a recording can be replayed
//! through a session exactly like a live stream.

use std::path::Path;

use bytes::{Buf as _, Bytes};
use time::OffsetDateTime;

use crate::{errors::ParseError, models::Fix};

/// Nominal user-equivalent range error used to turn HDOP into meters.
pub const HDOP_UERE_M: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Gpx,
    JsonLines,
}

impl FileType {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "gpx" => Some(FileType::Gpx),
            "jsonl" | "ndjson" | "json" => Some(FileType::JsonLines),
            _ => None,
        }
    }

    /// Guesses the format from the first non-whitespace byte.
    pub fn detect_from_bytes(bytes: &[u8]) -> Self {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => FileType::Gpx,
            _ => FileType::JsonLines,
        }
    }
}

/// Reads a fix log from disk, picking the parser from the extension or,
/// failing that, the content.
pub fn read_fix_log(path: impl AsRef<Path>) -> Result<Vec<Fix>, crate::errors::TrackerError> {
    let path = path.as_ref();
    let bytes = Bytes::from(std::fs::read(path)?);
    let file_type = FileType::from_path(path).unwrap_or_else(|| FileType::detect_from_bytes(&bytes));
    Ok(parse_fix_log(file_type, bytes)?)
}

pub fn parse_fix_log(file_type: FileType, bytes: Bytes) -> Result<Vec<Fix>, ParseError> {
    let fixes = match file_type {
        FileType::Gpx => parse_gpx(bytes)?,
        FileType::JsonLines => {
            let text = std::str::from_utf8(&bytes)?;
            parse_json_lines(text)?
        }
    };
    if fixes.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(fixes)
}

/// Parses every timestamped track point. Points without a time are skipped
/// since they cannot be placed in the stream.
pub fn parse_gpx(bytes: Bytes) -> Result<Vec<Fix>, ParseError> {
    let gpx = gpx::read(bytes.reader()).map_err(|e| ParseError::Gpx(e.to_string()))?;

    let mut fixes = Vec::new();
    for track in &gpx.tracks {
        for seg in &track.segments {
            for pt in &seg.points {
                let Some(time) = pt.time else {
                    continue;
                };
                let timestamp: OffsetDateTime = time.into();
                fixes.push(Fix {
                    lat: pt.point().y(),
                    lon: pt.point().x(),
                    speed_hint: pt.speed,
                    accuracy: pt.hdop.map(|h| h * HDOP_UERE_M),
                    timestamp_ms: (timestamp.unix_timestamp_nanos() / 1_000_000) as i64,
                });
            }
        }
    }
    Ok(fixes)
}

/// One JSON-encoded [`Fix`] per line. Blank lines are ignored.
pub fn parse_json_lines(text: &str) -> Result<Vec<Fix>, ParseError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| ParseError::Json {
                line: i + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="39.9000000" lon="116.4000000">
        <time>2024-05-01T08:00:00Z</time>
        <hdop>1.2</hdop>
      </trkpt>
      <trkpt lat="39.9000300" lon="116.4000000">
        <time>2024-05-01T08:00:02Z</time>
      </trkpt>
      <trkpt lat="39.9000600" lon="116.4000000"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_parse_gpx_points() {
        let fixes = parse_gpx(Bytes::from_static(SAMPLE_GPX.as_bytes())).unwrap();

        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].lat, 39.9);
        assert_eq!(fixes[0].lon, 116.4);
        assert!((fixes[0].accuracy.unwrap() - 6.0).abs() < 1e-9);
        assert_eq!(fixes[0].speed_hint, None);
        assert_eq!(fixes[1].accuracy, None);
        assert_eq!(fixes[1].timestamp_ms - fixes[0].timestamp_ms, 2000);
        assert_eq!(fixes[0].timestamp_ms, 1_714_550_400_000);
    }

    #[test]
    fn test_parse_json_lines() {
        let text = r#"{"lat":39.9,"lon":116.4,"accuracy":5.0,"timestamp_ms":0}

{"lat":39.90003,"lon":116.4,"speed_hint":1.4,"timestamp_ms":2000}
"#;
        let fixes = parse_json_lines(text).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].accuracy, Some(5.0));
        assert_eq!(fixes[1].speed_hint, Some(1.4));
    }

    #[test]
    fn test_json_error_reports_line() {
        let text = "{\"lat\":1.0,\"lon\":2.0,\"timestamp_ms\":0}\n{broken\n";
        match parse_json_lines(text) {
            Err(ParseError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected json error, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_file_type() {
        assert_eq!(FileType::detect_from_bytes(b"  <?xml"), FileType::Gpx);
        assert_eq!(FileType::detect_from_bytes(b"{\"lat\":1}"), FileType::JsonLines);
        assert_eq!(
            FileType::from_path(Path::new("walk.GPX")),
            Some(FileType::Gpx)
        );
        assert_eq!(FileType::from_path(Path::new("walk.txt")), None);
    }

    #[test]
    fn test_empty_log_is_an_error() {
        let result = parse_fix_log(FileType::JsonLines, Bytes::from_static(b"\n\n"));
        assert!(matches!(result, Err(ParseError::Empty)));
    }
}
