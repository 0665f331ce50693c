//! Campaign summary: partner payouts rolled up by campaign, quarter and
//! currency.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Datelike;
use revshare_core::{table, EnrichedRecord, RevshareResult};
use serde::{Deserialize, Serialize};

/// Header of the summary file, in [`CampaignSummaryRow`] field order.
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "campaign_name",
    "event_date_quarter",
    "currency",
    "records",
    "users",
    "gross_revenue",
    "net_revenue",
    "net_revenue_deal_amount",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummaryRow {
    pub campaign_name: String,
    pub event_date_quarter: String,
    pub currency: String,
    pub records: u64,
    pub users: u64,
    pub gross_revenue: f64,
    pub net_revenue: f64,
    pub net_revenue_deal_amount: f64,
}

#[derive(Default)]
struct Bucket<'a> {
    quarter_label: &'a str,
    records: u64,
    users: BTreeSet<&'a str>,
    gross_revenue: f64,
    net_revenue: f64,
    net_revenue_deal_amount: f64,
}

/// One row per (campaign, quarter, currency), quarters in calendar order.
pub fn summarize(records: &[EnrichedRecord]) -> Vec<CampaignSummaryRow> {
    let mut buckets: BTreeMap<(&str, (i32, u32), &str), Bucket> = BTreeMap::new();

    for r in records {
        let quarter = (r.event_year, (r.event_date.month() - 1) / 3 + 1);
        let key = (
            r.record.campaign_name.as_str(),
            quarter,
            r.record.currency.as_str(),
        );
        let bucket = buckets.entry(key).or_default();
        bucket.quarter_label = r.event_quarter.as_str();
        bucket.records += 1;
        bucket.users.insert(r.record.user_id.as_str());
        bucket.gross_revenue += r.record.revenue;
        bucket.net_revenue += r.net_revenue;
        bucket.net_revenue_deal_amount += r.net_revenue_deal_amount;
    }

    buckets
        .into_iter()
        .map(|((campaign, _, currency), b)| CampaignSummaryRow {
            campaign_name: campaign.to_string(),
            event_date_quarter: b.quarter_label.to_string(),
            currency: currency.to_string(),
            records: b.records,
            users: b.users.len() as u64,
            gross_revenue: b.gross_revenue,
            net_revenue: b.net_revenue,
            net_revenue_deal_amount: b.net_revenue_deal_amount,
        })
        .collect()
}

/// Write `rows` to `path`, header included even when there are none.
pub fn write_summary(path: &Path, rows: &[CampaignSummaryRow]) -> RevshareResult<usize> {
    table::write_rows_to_path(path, &SUMMARY_COLUMNS, rows)
}
