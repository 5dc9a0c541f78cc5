//! Fix log writers: GPX 1.1 tracks and JSON lines.
//!
//! Both formats are read back by `tracker::file_parsers`, so generated
//! streams can be replayed through the `replay` binary.

use std::path::Path;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracker::{
    file_parsers::{FileType, HDOP_UERE_M},
    models::Fix,
};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to encode fix: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write fix log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown fix log format for {0}")]
    UnknownFormat(String),
}

/// Generates a GPX 1.1 XML document from fixes.
///
/// Accuracy is written back as HDOP using the same range error the parser
/// assumes, so accuracy survives a round trip.
pub fn generate_gpx(fixes: &[Fix], track_name: &str) -> Vec<u8> {
    let mut gpx = String::new();

    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    gpx.push_str(r#"<gpx version="1.1" creator="live-tracker-test-data""#);
    gpx.push_str(r#" xmlns="http://www.topografix.com/GPX/1/1">"#);
    gpx.push('\n');

    gpx.push_str("  <trk>\n");
    gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(track_name)));
    gpx.push_str("    <trkseg>\n");

    for fix in fixes {
        gpx.push_str(&format!(
            r#"      <trkpt lat="{:.7}" lon="{:.7}">"#,
            fix.lat, fix.lon
        ));
        gpx.push('\n');

        if let Some(time) = format_timestamp(fix.timestamp_ms) {
            gpx.push_str(&format!("        <time>{time}</time>\n"));
        }
        if let Some(accuracy) = fix.accuracy {
            gpx.push_str(&format!("        <hdop>{:.3}</hdop>\n", accuracy / HDOP_UERE_M));
        }

        gpx.push_str("      </trkpt>\n");
    }

    gpx.push_str("    </trkseg>\n");
    gpx.push_str("  </trk>\n");
    gpx.push_str("</gpx>\n");

    gpx.into_bytes()
}

/// One JSON-encoded fix per line.
pub fn generate_json_lines(fixes: &[Fix]) -> Result<Vec<u8>, WriteError> {
    let mut out = Vec::new();
    for fix in fixes {
        serde_json::to_writer(&mut out, fix)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Writes fixes to `path`, choosing the format from the extension.
pub fn write_fix_log(path: impl AsRef<Path>, fixes: &[Fix]) -> Result<(), WriteError> {
    let path = path.as_ref();
    let bytes = match FileType::from_path(path) {
        Some(FileType::Gpx) => {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Generated track");
            generate_gpx(fixes, name)
        }
        Some(FileType::JsonLines) => generate_json_lines(fixes)?,
        None => return Err(WriteError::UnknownFormat(path.display().to_string())),
    };
    std::fs::write(path, bytes)?;
    Ok(())
}

fn format_timestamp(timestamp_ms: i64) -> Option<String> {
    let nanos = i128::from(timestamp_ms) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

/// Escapes XML special characters in a string.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
