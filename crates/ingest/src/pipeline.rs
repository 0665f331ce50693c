//! Bucket → flat event table. Objects are fetched and parsed concurrently
//! and merged back in key order.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use revshare_core::config::IngestConfig;
use revshare_core::table;
use revshare_core::{RawEventRow, RevshareResult};
use tracing::{debug, info, warn};

use crate::extract::{extract_rows, ExtractedRows};
use crate::selection::KeySelector;
use crate::store::{LocalObjectStore, ObjectStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub keys_listed: usize,
    pub keys_selected: usize,
    pub files_failed: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

impl IngestSummary {
    /// Whether this run wrote the merged table. An empty selection leaves
    /// whatever was at the output path untouched.
    pub fn wrote_table(&self) -> bool {
        self.keys_selected > 0
    }
}

pub struct Ingestor<S> {
    store: Arc<S>,
    selector: KeySelector,
    max_workers: usize,
}

impl Ingestor<LocalObjectStore> {
    pub fn from_config(config: &IngestConfig) -> RevshareResult<Self> {
        let selector = KeySelector::new(&config.key_suffix, &config.timestamp_threshold)?;
        Ok(Self::new(
            LocalObjectStore::new(&config.bucket_root),
            selector,
            config.max_workers,
        ))
    }
}

impl<S: ObjectStore + 'static> Ingestor<S> {
    pub fn new(store: S, selector: KeySelector, max_workers: usize) -> Self {
        Self {
            store: Arc::new(store),
            selector,
            max_workers: max_workers.max(1),
        }
    }

    /// Keys of the bucket that take part in this run, in key order.
    pub async fn selected_keys(&self) -> RevshareResult<(usize, Vec<String>)> {
        let listed = self.store.list_keys().await?;
        let total = listed.len();
        let selected: Vec<String> = listed
            .into_iter()
            .filter(|k| self.selector.selects(k))
            .collect();
        Ok((total, selected))
    }

    /// Fetch every selected object and write the merged table to `output`.
    /// When nothing is selected, no file is written.
    pub async fn run(&self, output: &Path) -> RevshareResult<IngestSummary> {
        let (keys_listed, keys) = self.selected_keys().await?;
        let mut summary = IngestSummary {
            keys_listed,
            keys_selected: keys.len(),
            ..Default::default()
        };

        if keys.is_empty() {
            info!(keys_listed, "No objects to process");
            return Ok(summary);
        }
        info!(
            keys_listed,
            keys_selected = keys.len(),
            workers = self.max_workers,
            "Merging exported objects"
        );

        // `buffered` yields results in submission order.
        let results: Vec<(String, RevshareResult<ExtractedRows>)> = stream::iter(keys)
            .map(|key| {
                let store = Arc::clone(&self.store);
                async move {
                    let result = fetch_and_extract(store.as_ref(), &key).await;
                    (key, result)
                }
            })
            .buffered(self.max_workers)
            .collect()
            .await;

        let mut rows: Vec<RawEventRow> = Vec::new();
        for (key, result) in results {
            match result {
                Ok(extracted) => {
                    debug!(key = %key, kept = extracted.rows.len(), dropped = extracted.dropped, "Object processed");
                    metrics::counter!("ingest.files_processed").increment(1);
                    summary.rows_dropped += extracted.dropped;
                    rows.extend(extracted.rows);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Object skipped");
                    metrics::counter!("ingest.files_failed").increment(1);
                    summary.files_failed += 1;
                }
            }
        }
        summary.rows_kept = rows.len();
        metrics::counter!("ingest.rows_kept").increment(summary.rows_kept as u64);
        metrics::counter!("ingest.rows_dropped").increment(summary.rows_dropped as u64);

        let path = output.to_path_buf();
        tokio::task::spawn_blocking(move || table::write_event_rows(&path, &rows))
            .await
            .map_err(anyhow::Error::from)??;

        info!(
            output = %output.display(),
            rows = summary.rows_kept,
            files_failed = summary.files_failed,
            "Event table written"
        );
        Ok(summary)
    }
}

async fn fetch_and_extract<S: ObjectStore + ?Sized>(
    store: &S,
    key: &str,
) -> RevshareResult<ExtractedRows> {
    let bytes = store.get(key).await?;
    let gzipped = key.ends_with(".gz");
    tokio::task::spawn_blocking(move || extract_rows(&bytes, gzipped))
        .await
        .map_err(anyhow::Error::from)?
}
