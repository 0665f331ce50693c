//! Partner revenue-share reporting: payment timelines, deal rules and the
//! per-campaign payout summary.

pub mod attribution;
pub mod rules;
pub mod summary;

pub use attribution::{AttributionOutcome, RevenueAttributionEngine};
pub use rules::{RevenueShareRule, RuleTable};
pub use summary::{summarize, write_summary, CampaignSummaryRow};
