//! JSON report generation

use crate::report::StreamReport;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonReport<'a> {
    generated: String,
    generator: &'static str,
    #[serde(flatten)]
    stream: &'a StreamReport<'a>,
}

pub fn write<W: Write>(writer: &mut W, report: &StreamReport<'_>) -> io::Result<()> {
    let report = JsonReport {
        generated: chrono::Utc::now().to_rfc3339(),
        generator: concat!("framecut ", env!("CARGO_PKG_VERSION")),
        stream: report,
    };

    let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;

    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")
}
