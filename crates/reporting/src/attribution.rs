//! Revenue attribution. Rebuilds each user's payment timeline from the
//! flat event table and assigns the partner's share of every payment.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use revshare_core::config::MalformedRecordPolicy;
use revshare_core::table;
use revshare_core::types::columns::REPORT_COLUMNS;
use revshare_core::{
    EnrichedRecord, EventRecord, RawEventRow, ReportRow, ReportTimeZone, RevshareError,
    RevshareResult,
};
use tracing::{debug, info, warn};

use crate::rules::RuleTable;

/// Share of gross revenue left after the 30% store commission.
pub const NET_REVENUE_SHARE: f64 = 0.7;

/// Months are a flat 30 days, not calendar months.
pub const SECONDS_PER_MONTH: i64 = 30 * 24 * 3600;

/// The first event of a user, which every later payment is measured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAnchor {
    pub created_at: i64,
    pub subscription_event_type: String,
}

/// A user's events in chronological order.
#[derive(Debug, Clone)]
pub struct UserTimeline<'a> {
    pub user_id: &'a str,
    pub events: Vec<&'a EventRecord>,
}

impl<'a> UserTimeline<'a> {
    /// The first event of the timeline, `None` when it has no events.
    pub fn anchor(&self) -> Option<PaymentAnchor> {
        self.events.first().map(|first| PaymentAnchor {
            created_at: first.created_at,
            subscription_event_type: first.subscription_event_type.clone(),
        })
    }
}

/// Group records already sorted by `created_at` into per-user timelines.
pub fn build_timelines<'a, I>(sorted: I) -> BTreeMap<&'a str, UserTimeline<'a>>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut timelines: BTreeMap<&str, UserTimeline> = BTreeMap::new();
    for record in sorted {
        timelines
            .entry(record.user_id.as_str())
            .or_insert_with(|| UserTimeline {
                user_id: &record.user_id,
                events: Vec::new(),
            })
            .events
            .push(record);
    }
    timelines
}

/// `Q<n>-<year>` of a calendar date.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("Q{}-{}", (date.month() - 1) / 3 + 1, date.year())
}

/// 1-based month of `elapsed_secs` since the first payment.
pub fn month_index(elapsed_secs: i64) -> i64 {
    1 + elapsed_secs.div_euclid(SECONDS_PER_MONTH)
}

/// Result of one attribution pass.
#[derive(Debug, Default)]
pub struct AttributionOutcome {
    /// Sorted by user, then `created_at`.
    pub records: Vec<EnrichedRecord>,
    /// Rows left out of the report, each with its reason.
    pub rejected: Vec<RevshareError>,
}

impl AttributionOutcome {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn total_deal_amount(&self) -> f64 {
        self.records.iter().map(|r| r.net_revenue_deal_amount).sum()
    }
}

/// A validated record with its calendar dates resolved.
struct DatedRecord {
    record: EventRecord,
    event_date: NaiveDate,
    install_date: NaiveDate,
}

pub struct RevenueAttributionEngine {
    rules: RuleTable,
    timezone: ReportTimeZone,
    policy: MalformedRecordPolicy,
}

impl RevenueAttributionEngine {
    pub fn new(rules: RuleTable, timezone: ReportTimeZone) -> Self {
        Self {
            rules,
            timezone,
            policy: MalformedRecordPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MalformedRecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Read `input`, attribute every row and write the detail report to
    /// `output`. Nothing is written when the input is missing or when a
    /// malformed row aborts the run.
    pub fn process_file(&self, input: &Path, output: &Path) -> RevshareResult<AttributionOutcome> {
        let rows = table::read_event_rows(input)?;
        let outcome = self.process_rows(rows)?;
        let written = table::write_rows_to_path(
            output,
            &REPORT_COLUMNS,
            outcome.records.iter().map(ReportRow::from),
        )?;
        info!(
            input = %input.display(),
            output = %output.display(),
            rows = written,
            rejected = outcome.rejected_count(),
            "Attribution report written"
        );
        Ok(outcome)
    }

    /// Attribute text rows as read from the event table. Row numbers in
    /// rejections are 1-based data rows.
    pub fn process_rows(&self, rows: Vec<RawEventRow>) -> RevshareResult<AttributionOutcome> {
        let mut validated = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();
        for (i, raw) in rows.into_iter().enumerate() {
            let row = i + 1;
            match EventRecord::from_raw(row, raw).and_then(|r| self.date_record(row, r)) {
                Ok(dated) => validated.push(dated),
                Err(e) => self.reject(e, &mut rejected)?,
            }
        }
        Ok(self.finish(validated, rejected))
    }

    /// Attribute already validated records. Row numbers in rejections are
    /// 1-based positions in `records`, which differ from the data-row
    /// numbers of [`Self::process_rows`] once rows were filtered upstream.
    pub fn enrich(&self, records: Vec<EventRecord>) -> RevshareResult<AttributionOutcome> {
        let mut validated = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for (i, record) in records.into_iter().enumerate() {
            match self.date_record(i + 1, record) {
                Ok(dated) => validated.push(dated),
                Err(e) => self.reject(e, &mut rejected)?,
            }
        }
        Ok(self.finish(validated, rejected))
    }

    fn reject(&self, error: RevshareError, rejected: &mut Vec<RevshareError>) -> RevshareResult<()> {
        match self.policy {
            MalformedRecordPolicy::Abort => Err(error),
            MalformedRecordPolicy::Skip => {
                warn!(error = %error, "Record rejected");
                metrics::counter!("attribution.records_rejected").increment(1);
                rejected.push(error);
                Ok(())
            }
        }
    }

    fn date_record(&self, row: usize, record: EventRecord) -> RevshareResult<DatedRecord> {
        let event_date = self.timezone.date_of(record.created_at).ok_or_else(|| {
            RevshareError::MalformedTimestamp {
                row,
                field: "created_at",
                value: record.created_at.to_string(),
            }
        })?;
        let install_date = self.timezone.date_of(record.installed_at).ok_or_else(|| {
            RevshareError::MalformedTimestamp {
                row,
                field: "installed_at",
                value: record.installed_at.to_string(),
            }
        })?;
        Ok(DatedRecord {
            record,
            event_date,
            install_date,
        })
    }

    fn finish(&self, mut dated: Vec<DatedRecord>, rejected: Vec<RevshareError>) -> AttributionOutcome {
        // Stable: events created in the same second keep their input order.
        dated.sort_by_key(|d| d.record.created_at);

        let anchors: HashMap<String, PaymentAnchor> =
            build_timelines(dated.iter().map(|d| &d.record))
                .into_values()
                .filter_map(|t| Some((t.user_id.to_string(), t.anchor()?)))
                .collect();
        debug!(users = anchors.len(), records = dated.len(), "Timelines rebuilt");

        let ranks: Vec<u32> = {
            let mut seen: HashMap<(NaiveDate, &str, &str), u32> = HashMap::new();
            dated
                .iter()
                .map(|d| {
                    let key = (
                        d.event_date,
                        d.record.user_id.as_str(),
                        d.record.event_name.as_str(),
                    );
                    let count = seen.entry(key).or_insert(0);
                    *count += 1;
                    *count
                })
                .collect()
        };

        let mut records: Vec<EnrichedRecord> = dated
            .into_iter()
            .zip(ranks)
            .map(|(d, rank)| {
                let anchor = &anchors[d.record.user_id.as_str()];
                self.enrich_one(d, rank, anchor)
            })
            .collect();

        records.sort_by(|a, b| {
            a.record
                .user_id
                .cmp(&b.record.user_id)
                .then(a.record.created_at.cmp(&b.record.created_at))
        });

        metrics::counter!("attribution.records_enriched").increment(records.len() as u64);
        AttributionOutcome { records, rejected }
    }

    fn enrich_one(&self, dated: DatedRecord, rank: u32, anchor: &PaymentAnchor) -> EnrichedRecord {
        let DatedRecord {
            record,
            event_date,
            install_date,
        } = dated;

        let time_since_first_payment = record.created_at - anchor.created_at;
        let month = month_index(time_since_first_payment);
        let net_revenue = record.revenue * NET_REVENUE_SHARE;
        let ratio = self
            .rules
            .ratio_for(&record.campaign_name, &record.adgroup_name, month);

        EnrichedRecord {
            event_date,
            install_date,
            rank,
            first_payment_date: anchor.created_at,
            first_payment_subscription_event_type: anchor.subscription_event_type.clone(),
            time_since_first_payment,
            event_year: event_date.year(),
            event_quarter: quarter_label(event_date),
            month_index_since_first_payment: month,
            net_revenue,
            revenue_deal_ratio: ratio,
            net_revenue_deal_amount: net_revenue * ratio,
            record,
        }
    }
}
