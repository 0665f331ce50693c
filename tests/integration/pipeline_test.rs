//! End-to-end test: gzip bucket → event table → revenue-share report.

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use revshare_core::config::IngestConfig;
use revshare_core::ReportTimeZone;
use revshare_ingest::Ingestor;
use revshare_reporting::{summarize, RevenueAttributionEngine, RuleTable};

const HEADER: &str = "{reporting_revenue},{event_name},{created_at},{installed_at},{random_user_id},{subscription_event_type},{currency},{campaign_name},{tracker},{adgroup_name},{os_name}";

const T0: i64 = 1_700_000_000;
const MONTH: i64 = 30 * 24 * 3600;

fn write_export(bucket: &Path, key: &str, rows: &[String]) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    writeln!(encoder, "{HEADER}").unwrap();
    for row in rows {
        writeln!(encoder, "{row}").unwrap();
    }
    let path = bucket.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn row(revenue: &str, event: &str, created_at: i64, user: &str, campaign: &str, adgroup: &str) -> String {
    format!(
        "{revenue},{event},{created_at},{},{user},activation,EUR,{campaign},trk,{adgroup},ios",
        created_at - 3_600
    )
}

#[tokio::test]
async fn test_bucket_to_report() {
    let bucket = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    write_export(
        bucket.path(),
        "2023/app_2023-11-14T000000.csv.gz",
        &[
            row("10.0", "subscription", T0, "U1", "Icnews", "fb"),
            row("", "session", T0 + 5, "U1", "Icnews", "fb"),
            row("5.0", "subscription", T0 + 10, "U2", "hozana", "community"),
            row("5.0", "subscription", T0 + 10, "U3", "Hozana", "community"),
        ],
    );
    write_export(
        bucket.path(),
        "2024/app_2024-11-20T000000.csv.gz",
        &[
            row("10.0", "subscription", T0 + 12 * MONTH, "U1", "Icnews", "fb"),
            row("10.0", "subscription", T0 + 12 * MONTH + 60, "U1", "Icnews", "fb"),
        ],
    );
    write_export(
        bucket.path(),
        "2021/app_2021-06-01T000000.csv.gz",
        &[row("99.0", "subscription", T0, "OLD", "Icnews", "fb")],
    );

    let raw_table = work.path().join("raw.csv");
    let config = IngestConfig {
        bucket_root: bucket.path().to_path_buf(),
        output_file: raw_table.clone(),
        max_workers: 3,
        ..Default::default()
    };
    let summary = Ingestor::from_config(&config)
        .unwrap()
        .run(&config.output_file)
        .await
        .unwrap();
    assert_eq!(summary.keys_listed, 3);
    assert_eq!(summary.keys_selected, 2);
    assert_eq!(summary.rows_kept, 5);
    assert_eq!(summary.rows_dropped, 1);

    let report = work.path().join("report.csv");
    let engine = RevenueAttributionEngine::new(RuleTable::builtin(), ReportTimeZone::Utc);
    let outcome = engine.process_file(&raw_table, &report).unwrap();
    assert_eq!(outcome.records.len(), summary.rows_kept);
    assert_eq!(outcome.rejected_count(), 0);

    let u1: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.record.user_id == "U1")
        .collect();
    assert_eq!(u1.len(), 3);
    assert_eq!(u1[0].month_index_since_first_payment, 1);
    assert_eq!(u1[0].revenue_deal_ratio, 0.5);
    assert_eq!(u1[1].month_index_since_first_payment, 13);
    assert_eq!(u1[1].revenue_deal_ratio, 0.25);
    assert_eq!(u1[1].rank, 1);
    assert_eq!(u1[2].rank, 2);
    assert!(u1.iter().all(|r| r.first_payment_date == T0));

    let ratio_of = |user: &str| {
        outcome
            .records
            .iter()
            .find(|r| r.record.user_id == user)
            .map(|r| r.revenue_deal_ratio)
            .unwrap()
    };
    assert_eq!(ratio_of("U2"), 0.0);
    assert_eq!(ratio_of("U3"), 0.5);

    let report_text = std::fs::read_to_string(&report).unwrap();
    assert_eq!(report_text.lines().count(), 1 + outcome.records.len());

    let campaigns = summarize(&outcome.records);
    let icnews_share: f64 = campaigns
        .iter()
        .filter(|c| c.campaign_name == "Icnews")
        .map(|c| c.net_revenue_deal_amount)
        .sum();
    assert!((icnews_share - (3.5 + 1.75 + 1.75)).abs() < 1e-9);
}
