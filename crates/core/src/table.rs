//! Headered CSV files exchanged between the stages.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{RevshareError, RevshareResult};
use crate::types::columns::EVENT_COLUMNS;
use crate::types::RawEventRow;

/// Read every event row of `path`. A missing file is reported before
/// anything is opened for writing downstream.
pub fn read_event_rows(path: &Path) -> RevshareResult<Vec<RawEventRow>> {
    if !path.is_file() {
        return Err(RevshareError::MissingInput(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let rows = reader
        .deserialize::<RawEventRow>()
        .collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "Event table loaded");
    Ok(rows)
}

/// Serialize `rows` to `writer` under `header`. The header is written even
/// when there are no rows, so an empty run still yields a readable table.
/// Returns the number of data rows written.
pub fn write_rows<W, S, I>(writer: W, header: &[&str], rows: I) -> RevshareResult<usize>
where
    W: Write,
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(header)?;
    let mut count = 0usize;
    for row in rows {
        csv_writer.serialize(row)?;
        count += 1;
    }
    csv_writer.flush()?;
    Ok(count)
}

/// [`write_rows`] into a freshly created file at `path`.
pub fn write_rows_to_path<S, I>(path: &Path, header: &[&str], rows: I) -> RevshareResult<usize>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let count = write_rows(std::io::BufWriter::new(file), header, rows)?;
    debug!(path = %path.display(), rows = count, "Table written");
    Ok(count)
}

/// Write event rows to `path` under [`EVENT_COLUMNS`].
pub fn write_event_rows<'a, I>(path: &Path, rows: I) -> RevshareResult<usize>
where
    I: IntoIterator<Item = &'a RawEventRow>,
{
    write_rows_to_path(path, &EVENT_COLUMNS, rows)
}
