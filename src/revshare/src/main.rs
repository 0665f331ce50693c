//! revshare builds the partner revenue-share report from exported
//! attribution logs.
//!
//! `ingest` flattens the bucket into one event table, `attribute` turns that
//! table into the per-payment report, `run` does both.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use revshare_core::config::{AppConfig, AttributionConfig, MalformedRecordPolicy};
use revshare_ingest::{IngestSummary, Ingestor};
use revshare_reporting::{summarize, write_summary, RevenueAttributionEngine, RuleTable};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "revshare")]
#[command(about = "Partner revenue-share reporting from exported attribution logs")]
#[command(version)]
struct Cli {
    /// Config file (TOML, JSON or YAML); environment variables prefixed
    /// `REVSHARE__` override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true, default_value_t = false)]
    pretty_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge the exported objects of the bucket into one event table
    Ingest(IngestArgs),

    /// Compute the revenue-share report from an event table
    Attribute(AttributeArgs),

    /// Ingest, then attribute the freshly ingested table
    Run {
        #[command(flatten)]
        ingest: IngestArgs,
        #[command(flatten)]
        attribute: ReportArgs,
    },

    /// Print the effective revenue-share rule table as JSON
    Rules {
        /// JSON rule file (overrides config)
        #[arg(long)]
        rules_file: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct IngestArgs {
    /// Root directory of the bucket (overrides config)
    #[arg(long)]
    bucket_root: Option<PathBuf>,

    /// Oldest object stamp to include, YYYY-MM-DDTHHMMSS (overrides config)
    #[arg(long)]
    threshold: Option<String>,

    /// Objects fetched concurrently (overrides config)
    #[arg(long)]
    workers: Option<usize>,

    /// Merged event table (overrides config)
    #[arg(long)]
    raw_output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct AttributeArgs {
    /// Event table to read (overrides config)
    #[arg(long)]
    input: Option<PathBuf>,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Detail report (overrides config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Per-campaign summary file (overrides config)
    #[arg(long)]
    summary: Option<PathBuf>,

    /// UTC, local, or a fixed offset such as +01:00 (overrides config)
    #[arg(long)]
    timezone: Option<String>,

    /// JSON rule file (overrides config)
    #[arg(long)]
    rules_file: Option<PathBuf>,

    /// Fail on the first malformed row instead of skipping it
    #[arg(long, default_value_t = false)]
    abort_on_malformed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.pretty_logs);

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest(args) => {
            args.apply(&mut config);
            ingest(&config).await?;
        }
        Commands::Attribute(args) => {
            if let Some(input) = args.input {
                config.attribution.input_file = input;
            }
            args.report.apply(&mut config.attribution)?;
            attribute(&config.attribution)?;
        }
        Commands::Run { ingest: i, attribute: a } => {
            i.apply(&mut config);
            a.apply(&mut config.attribution)?;
            run(&mut config).await?;
        }
        Commands::Rules { rules_file } => {
            let path = rules_file.or(config.attribution.rules_file);
            let rules = load_rules(path.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }

    Ok(())
}

fn init_tracing(pretty: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "revshare=info,revshare_ingest=info,revshare_reporting=info".into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if pretty {
        builder.init();
    } else {
        builder.json().init();
    }
}

impl IngestArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(root) = self.bucket_root {
            config.ingest.bucket_root = root;
        }
        if let Some(threshold) = self.threshold {
            config.ingest.timestamp_threshold = threshold;
        }
        if let Some(workers) = self.workers {
            config.ingest.max_workers = workers;
        }
        if let Some(output) = self.raw_output {
            config.ingest.output_file = output;
        }
    }
}

impl ReportArgs {
    fn apply(self, config: &mut AttributionConfig) -> anyhow::Result<()> {
        if let Some(output) = self.output {
            config.output_file = output;
        }
        if let Some(summary) = self.summary {
            config.summary_file = Some(summary);
        }
        if let Some(tz) = self.timezone {
            config.timezone = tz.parse()?;
        }
        if let Some(rules) = self.rules_file {
            config.rules_file = Some(rules);
        }
        if self.abort_on_malformed {
            config.malformed_records = MalformedRecordPolicy::Abort;
        }
        Ok(())
    }
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<RuleTable> {
    Ok(match path {
        Some(p) => RuleTable::from_json_file(p)?,
        None => RuleTable::builtin(),
    })
}

async fn ingest(config: &AppConfig) -> anyhow::Result<IngestSummary> {
    info!(
        bucket_root = %config.ingest.bucket_root.display(),
        threshold = %config.ingest.timestamp_threshold,
        workers = config.ingest.max_workers,
        "Ingest starting"
    );
    let ingestor = Ingestor::from_config(&config.ingest)?;
    let summary = ingestor.run(&config.ingest.output_file).await?;
    info!(
        keys_listed = summary.keys_listed,
        keys_selected = summary.keys_selected,
        files_failed = summary.files_failed,
        rows_kept = summary.rows_kept,
        rows_dropped = summary.rows_dropped,
        "Ingest finished"
    );
    Ok(summary)
}

/// Ingest, then attribute the table this run produced. Returns whether
/// attribution ran; a table left at the output path by an earlier run is
/// never attributed.
async fn run(config: &mut AppConfig) -> anyhow::Result<bool> {
    config.attribution.input_file = config.ingest.output_file.clone();
    let summary = ingest(config).await?;
    if !summary.wrote_table() {
        warn!(
            path = %config.ingest.output_file.display(),
            "Nothing ingested, attribution skipped"
        );
        return Ok(false);
    }
    attribute(&config.attribution)?;
    Ok(true)
}

fn attribute(config: &AttributionConfig) -> anyhow::Result<()> {
    info!(
        input = %config.input_file.display(),
        timezone = %config.timezone,
        "Attribution starting"
    );
    let rules = load_rules(config.rules_file.as_deref())?;
    let engine = RevenueAttributionEngine::new(rules, config.timezone)
        .with_policy(config.malformed_records);
    let outcome = engine.process_file(&config.input_file, &config.output_file)?;

    if let Some(summary_path) = &config.summary_file {
        let rows = summarize(&outcome.records);
        let written = write_summary(summary_path, &rows)?;
        info!(path = %summary_path.display(), rows = written, "Campaign summary written");
    }

    if outcome.rejected_count() > 0 {
        warn!(
            rejected = outcome.rejected_count(),
            "Malformed rows left out of the report"
        );
    }
    info!(
        records = outcome.records.len(),
        partner_share = outcome.total_deal_amount(),
        "Attribution finished"
    );
    Ok(())
}
