//! Which objects of the bucket take part in a run.

use regex::Regex;
use revshare_core::{RevshareError, RevshareResult};

const STAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2}T\d{6}";

/// Selects keys by suffix and by the `YYYY-MM-DDTHHMMSS` stamp embedded in
/// the key. Stamps compare as strings, which matches chronological order
/// for this fixed-width format.
#[derive(Debug, Clone)]
pub struct KeySelector {
    suffix: String,
    threshold: String,
    stamp: Regex,
}

impl KeySelector {
    pub fn new(suffix: impl Into<String>, threshold: impl Into<String>) -> RevshareResult<Self> {
        let threshold = threshold.into();
        let anchored = Regex::new(&format!("^{STAMP_PATTERN}$"))
            .map_err(|e| RevshareError::Config(e.to_string()))?;
        if !anchored.is_match(&threshold) {
            return Err(RevshareError::Config(format!(
                "timestamp threshold {threshold:?} is not YYYY-MM-DDTHHMMSS"
            )));
        }
        let stamp = Regex::new(STAMP_PATTERN).map_err(|e| RevshareError::Config(e.to_string()))?;
        Ok(Self {
            suffix: suffix.into(),
            threshold,
            stamp,
        })
    }

    /// First stamp found in `key`.
    pub fn embedded_stamp<'k>(&self, key: &'k str) -> Option<&'k str> {
        self.stamp.find(key).map(|m| m.as_str())
    }

    pub fn selects(&self, key: &str) -> bool {
        key.ends_with(&self.suffix)
            && self
                .embedded_stamp(key)
                .is_some_and(|stamp| stamp >= self.threshold.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> KeySelector {
        KeySelector::new(".csv.gz", "2022-01-01T000000").unwrap()
    }

    #[test]
    fn test_selects_recent_gzip_exports() {
        let s = selector();
        assert!(s.selects("app_2022-01-01T000000_export.csv.gz"));
        assert!(s.selects("logs/app_2023-07-15T133000.csv.gz"));
    }

    #[test]
    fn test_skips_old_or_unstamped_or_wrong_suffix() {
        let s = selector();
        assert!(!s.selects("app_2021-12-31T235959.csv.gz"));
        assert!(!s.selects("app_latest.csv.gz"));
        assert!(!s.selects("app_2023-07-15T133000.csv"));
        assert!(!s.selects("app_2023-07-15T133000.csv.gz.tmp"));
    }

    #[test]
    fn test_uses_first_stamp_in_key() {
        let s = selector();
        assert_eq!(
            s.embedded_stamp("2021-05-01T000000/app_2023-01-01T000000.csv.gz"),
            Some("2021-05-01T000000")
        );
        assert!(!s.selects("2021-05-01T000000/app_2023-01-01T000000.csv.gz"));
    }

    #[test]
    fn test_rejects_malformed_threshold() {
        assert!(KeySelector::new(".csv.gz", "2022-01-01").is_err());
        assert!(KeySelector::new(".csv.gz", "2022-01-01T00:00:00").is_err());
    }
}
