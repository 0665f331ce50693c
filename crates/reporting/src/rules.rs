//! Revenue-share deal table: which fraction of net revenue goes to a
//! marketing partner, by campaign, ad group and months since first payment.
//!
//! Rules are evaluated in declaration order against every record and the
//! last matching rule wins. A record no rule matches gets [`DEFAULT_RATIO`].

use std::path::Path;

use revshare_core::{RevshareError, RevshareResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RATIO: f64 = 0.0;

/// Inclusive range of month indices (the first month after the first
/// payment is month 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthWindow {
    pub first: i64,
    pub last: i64,
}

impl MonthWindow {
    pub const fn new(first: i64, last: i64) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, month_index: i64) -> bool {
        (self.first..=self.last).contains(&month_index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueShareRule {
    /// Exact, case-sensitive campaign name.
    pub campaign: String,
    /// Ad groups this rule never applies to.
    #[serde(default)]
    pub excluded_adgroups: Vec<String>,
    pub months: MonthWindow,
    pub ratio: f64,
}

impl RevenueShareRule {
    fn new(campaign: &str, excluded_adgroups: &[&str], months: MonthWindow, ratio: f64) -> Self {
        Self {
            campaign: campaign.to_string(),
            excluded_adgroups: excluded_adgroups.iter().map(|s| s.to_string()).collect(),
            months,
            ratio,
        }
    }

    pub fn matches(&self, campaign: &str, adgroup: &str, month_index: i64) -> bool {
        self.campaign == campaign
            && !self.excluded_adgroups.iter().any(|a| a == adgroup)
            && self.months.contains(month_index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<RevenueShareRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<RevenueShareRule>) -> RevshareResult<Self> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    /// The negotiated deals currently in force.
    ///
    /// `hozana` and `Hozana` are separate deals with different ad-group
    /// exclusions; campaign names are not case folded.
    pub fn builtin() -> Self {
        let first_year = MonthWindow::new(1, 12);
        Self {
            rules: vec![
                RevenueShareRule::new(
                    "hozana",
                    &["cp-semaine-sainte", "CP", "community"],
                    first_year,
                    0.5,
                ),
                RevenueShareRule::new("Hozana", &["CP-rentree", "CP", "cdi-mdj"], first_year, 0.5),
                RevenueShareRule::new(
                    "Hozana_affilie",
                    &["cp-semaine-sainte", "CP", "community"],
                    first_year,
                    0.5,
                ),
                RevenueShareRule::new("Icnews", &[], first_year, 0.5),
                RevenueShareRule::new("Icnews", &[], MonthWindow::new(13, 36), 0.25),
            ],
        }
    }

    /// Load a JSON array of rules.
    pub fn from_json_file(path: &Path) -> RevshareResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RevshareError::Config(format!("cannot read rule file {}: {e}", path.display()))
        })?;
        let table: Self = serde_json::from_str(&text)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> RevshareResult<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.campaign.is_empty() {
                return Err(RevshareError::Config(format!("rule {i}: empty campaign name")));
            }
            if !(0.0..=1.0).contains(&rule.ratio) {
                return Err(RevshareError::Config(format!(
                    "rule {i} ({}): ratio {} outside [0, 1]",
                    rule.campaign, rule.ratio
                )));
            }
            if rule.months.first < 1 || rule.months.last < rule.months.first {
                return Err(RevshareError::Config(format!(
                    "rule {i} ({}): invalid month window {}..={}",
                    rule.campaign, rule.months.first, rule.months.last
                )));
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[RevenueShareRule] {
        &self.rules
    }

    /// Ratio of the last rule matching the record, or [`DEFAULT_RATIO`].
    pub fn ratio_for(&self, campaign: &str, adgroup: &str, month_index: i64) -> f64 {
        self.rules
            .iter()
            .rev()
            .find(|r| r.matches(campaign, adgroup, month_index))
            .map_or(DEFAULT_RATIO, |r| r.ratio)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}
