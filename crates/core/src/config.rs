use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timezone::ReportTimeZone;

/// Root application configuration. Loaded from an optional config file
/// and environment variables with the prefix `REVSHARE__`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Root directory of the object store holding the exported logs.
    #[serde(default = "default_bucket_root")]
    pub bucket_root: PathBuf,
    #[serde(default = "default_key_suffix")]
    pub key_suffix: String,
    /// Objects whose embedded `YYYY-MM-DDTHHMMSS` stamp sorts below this
    /// are ignored.
    #[serde(default = "default_timestamp_threshold")]
    pub timestamp_threshold: String,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_raw_output")]
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttributionConfig {
    #[serde(default = "default_raw_output")]
    pub input_file: PathBuf,
    #[serde(default = "default_report_output")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub summary_file: Option<PathBuf>,
    #[serde(default)]
    pub timezone: ReportTimeZone,
    #[serde(default)]
    pub malformed_records: MalformedRecordPolicy,
    /// JSON rule table replacing the built-in one.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

/// What to do with a row whose revenue or timestamps cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRecordPolicy {
    /// Drop the row, keep going, report the count.
    #[default]
    Skip,
    /// Fail the whole run before any output is written.
    Abort,
}

fn default_bucket_root() -> PathBuf {
    PathBuf::from("./bucket")
}
fn default_key_suffix() -> String {
    ".csv.gz".to_string()
}
fn default_timestamp_threshold() -> String {
    "2022-01-01T000000".to_string()
}
fn default_max_workers() -> usize {
    10
}
fn default_raw_output() -> PathBuf {
    PathBuf::from("raw_aws_data.csv")
}
fn default_report_output() -> PathBuf {
    PathBuf::from("processed_attribution_data.csv")
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bucket_root: default_bucket_root(),
            key_suffix: default_key_suffix(),
            timestamp_threshold: default_timestamp_threshold(),
            max_workers: default_max_workers(),
            output_file: default_raw_output(),
        }
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            input_file: default_raw_output(),
            output_file: default_report_output(),
            summary_file: None,
            timezone: ReportTimeZone::default(),
            malformed_records: MalformedRecordPolicy::default(),
            rules_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file, then environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("REVSHARE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
