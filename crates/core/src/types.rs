//! Record schema shared by the ingest and attribution stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RevshareError, RevshareResult};

/// Column names of the exported event logs, in output order.
pub mod columns {
    pub const REVENUE: &str = "{reporting_revenue}";
    pub const EVENT_NAME: &str = "{event_name}";
    pub const CREATED_AT: &str = "{created_at}";
    pub const INSTALLED_AT: &str = "{installed_at}";
    pub const USER_ID: &str = "{random_user_id}";
    pub const SUBSCRIPTION_EVENT_TYPE: &str = "{subscription_event_type}";
    pub const CURRENCY: &str = "{currency}";
    pub const CAMPAIGN_NAME: &str = "{campaign_name}";
    pub const TRACKER: &str = "{tracker}";
    pub const ADGROUP_NAME: &str = "{adgroup_name}";

    pub const EVENT_COLUMNS: [&str; 10] = [
        REVENUE,
        EVENT_NAME,
        CREATED_AT,
        INSTALLED_AT,
        USER_ID,
        SUBSCRIPTION_EVENT_TYPE,
        CURRENCY,
        CAMPAIGN_NAME,
        TRACKER,
        ADGROUP_NAME,
    ];

    /// Header of the attribution report: the event columns followed by the
    /// derived ones.
    pub const REPORT_COLUMNS: [&str; 22] = [
        REVENUE,
        EVENT_NAME,
        CREATED_AT,
        INSTALLED_AT,
        USER_ID,
        SUBSCRIPTION_EVENT_TYPE,
        CURRENCY,
        CAMPAIGN_NAME,
        TRACKER,
        ADGROUP_NAME,
        "event_date",
        "install_date",
        "rank",
        "first_payment_date",
        "first_payment_subscription_event_type",
        "time_since_first_payment",
        "event_date_year",
        "event_date_quarter",
        "i_th_month_since_first_payment",
        "net_revenue",
        "revenue_deal_ratio",
        "net_revenue_deal_amount",
    ];
}

/// One event row as text, exactly as it travels between the two stages.
///
/// Field order matches [`columns::EVENT_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEventRow {
    #[serde(rename = "{reporting_revenue}")]
    pub revenue: String,
    #[serde(rename = "{event_name}")]
    pub event_name: String,
    #[serde(rename = "{created_at}")]
    pub created_at: String,
    #[serde(rename = "{installed_at}")]
    pub installed_at: String,
    #[serde(rename = "{random_user_id}")]
    pub user_id: String,
    #[serde(rename = "{subscription_event_type}")]
    pub subscription_event_type: String,
    #[serde(rename = "{currency}")]
    pub currency: String,
    #[serde(rename = "{campaign_name}")]
    pub campaign_name: String,
    #[serde(rename = "{tracker}")]
    pub tracker: String,
    #[serde(rename = "{adgroup_name}")]
    pub adgroup_name: String,
}

impl RawEventRow {
    /// Build a row from values given in [`columns::EVENT_COLUMNS`] order.
    /// Every value is trimmed.
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut v = values.into_iter().map(|s| s.trim().to_string());
        let mut next = || v.next().unwrap_or_default();
        Self {
            revenue: next(),
            event_name: next(),
            created_at: next(),
            installed_at: next(),
            user_id: next(),
            subscription_event_type: next(),
            currency: next(),
            campaign_name: next(),
            tracker: next(),
            adgroup_name: next(),
        }
    }

    /// Rows without a revenue or an event name carry nothing to attribute.
    pub fn is_reportable(&self) -> bool {
        !self.revenue.trim().is_empty() && !self.event_name.trim().is_empty()
    }
}

/// A validated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Gross revenue as reported by the attribution source.
    pub revenue: f64,
    pub event_name: String,
    /// Epoch seconds.
    pub created_at: i64,
    /// Epoch seconds.
    pub installed_at: i64,
    pub user_id: String,
    pub subscription_event_type: String,
    pub currency: String,
    pub campaign_name: String,
    pub tracker: String,
    pub adgroup_name: String,
}

impl EventRecord {
    /// Validate a text row. `row` is the 1-based data row number used in
    /// error reports.
    pub fn from_raw(row: usize, raw: RawEventRow) -> RevshareResult<Self> {
        let revenue = parse_revenue(row, &raw.revenue)?;
        let created_at = parse_epoch(row, "created_at", &raw.created_at)?;
        let installed_at = parse_epoch(row, "installed_at", &raw.installed_at)?;
        Ok(Self {
            revenue,
            event_name: raw.event_name,
            created_at,
            installed_at,
            user_id: raw.user_id,
            subscription_event_type: raw.subscription_event_type,
            currency: raw.currency,
            campaign_name: raw.campaign_name,
            tracker: raw.tracker,
            adgroup_name: raw.adgroup_name,
        })
    }
}

fn parse_revenue(row: usize, value: &str) -> RevshareResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RevshareError::MalformedRevenue {
            row,
            value: value.to_string(),
        }),
    }
}

/// Epochs are integers, but spreadsheet round trips sometimes render them
/// as `1700000000.0`; an integral float is accepted.
fn parse_epoch(row: usize, field: &'static str, value: &str) -> RevshareResult<i64> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(RevshareError::MalformedTimestamp {
            row,
            field,
            value: value.to_string(),
        }),
    }
}

/// An event with its attribution features.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: EventRecord,
    pub event_date: NaiveDate,
    pub install_date: NaiveDate,
    /// 1-based position among the user's same-day events of the same name.
    pub rank: u32,
    /// `created_at` of the user's earliest event.
    pub first_payment_date: i64,
    pub first_payment_subscription_event_type: String,
    /// Signed seconds since the anchor.
    pub time_since_first_payment: i64,
    pub event_year: i32,
    /// `Q<n>-<year>`, e.g. `Q3-2024`.
    pub event_quarter: String,
    pub month_index_since_first_payment: i64,
    pub net_revenue: f64,
    pub revenue_deal_ratio: f64,
    pub net_revenue_deal_amount: f64,
}

/// Flat, borrowed view of an [`EnrichedRecord`] for the report file. Field
/// order matches [`columns::REPORT_COLUMNS`].
#[derive(Debug, Serialize)]
pub struct ReportRow<'a> {
    #[serde(rename = "{reporting_revenue}")]
    pub revenue: f64,
    #[serde(rename = "{event_name}")]
    pub event_name: &'a str,
    #[serde(rename = "{created_at}")]
    pub created_at: i64,
    #[serde(rename = "{installed_at}")]
    pub installed_at: i64,
    #[serde(rename = "{random_user_id}")]
    pub user_id: &'a str,
    #[serde(rename = "{subscription_event_type}")]
    pub subscription_event_type: &'a str,
    #[serde(rename = "{currency}")]
    pub currency: &'a str,
    #[serde(rename = "{campaign_name}")]
    pub campaign_name: &'a str,
    #[serde(rename = "{tracker}")]
    pub tracker: &'a str,
    #[serde(rename = "{adgroup_name}")]
    pub adgroup_name: &'a str,
    pub event_date: NaiveDate,
    pub install_date: NaiveDate,
    pub rank: u32,
    pub first_payment_date: i64,
    pub first_payment_subscription_event_type: &'a str,
    pub time_since_first_payment: i64,
    pub event_date_year: i32,
    pub event_date_quarter: &'a str,
    pub i_th_month_since_first_payment: i64,
    pub net_revenue: f64,
    pub revenue_deal_ratio: f64,
    pub net_revenue_deal_amount: f64,
}

impl<'a> From<&'a EnrichedRecord> for ReportRow<'a> {
    fn from(e: &'a EnrichedRecord) -> Self {
        let r = &e.record;
        Self {
            revenue: r.revenue,
            event_name: &r.event_name,
            created_at: r.created_at,
            installed_at: r.installed_at,
            user_id: &r.user_id,
            subscription_event_type: &r.subscription_event_type,
            currency: &r.currency,
            campaign_name: &r.campaign_name,
            tracker: &r.tracker,
            adgroup_name: &r.adgroup_name,
            event_date: e.event_date,
            install_date: e.install_date,
            rank: e.rank,
            first_payment_date: e.first_payment_date,
            first_payment_subscription_event_type: &e.first_payment_subscription_event_type,
            time_since_first_payment: e.time_since_first_payment,
            event_date_year: e.event_year,
            event_date_quarter: &e.event_quarter,
            i_th_month_since_first_payment: e.month_index_since_first_payment,
            net_revenue: e.net_revenue,
            revenue_deal_ratio: e.revenue_deal_ratio,
            net_revenue_deal_amount: e.net_revenue_deal_amount,
        }
    }
}
