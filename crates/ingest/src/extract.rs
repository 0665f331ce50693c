//! Turns one exported object into event rows.

use std::io::Read;

use flate2::read::GzDecoder;
use revshare_core::types::columns::EVENT_COLUMNS;
use revshare_core::{RawEventRow, RevshareResult};

#[derive(Debug, Default)]
pub struct ExtractedRows {
    pub rows: Vec<RawEventRow>,
    /// Rows without revenue or event name.
    pub dropped: usize,
}

/// Parse a headered CSV object, gunzipping it first when `gzipped`.
/// Only the event columns are kept; absent columns read as empty.
pub fn extract_rows(bytes: &[u8], gzipped: bool) -> RevshareResult<ExtractedRows> {
    let source: Box<dyn Read + '_> = if gzipped {
        Box::new(GzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let positions: Vec<Option<usize>> = EVENT_COLUMNS
        .iter()
        .map(|column| headers.iter().position(|h| h.trim() == *column))
        .collect();

    let mut extracted = ExtractedRows::default();
    for record in reader.records() {
        let record = record?;
        let row = RawEventRow::from_values(
            positions
                .iter()
                .map(|p| p.and_then(|i| record.get(i)).unwrap_or("")),
        );
        if row.is_reportable() {
            extracted.rows.push(row);
        } else {
            extracted.dropped += 1;
        }
    }
    Ok(extracted)
}
