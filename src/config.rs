//! Cache configuration.
//!
//! # Environment Variables
//!
//! - `FASTREFLECT_METRICS`: Collect cache metrics (`"1"` or `"true"`)
use std::env;

pub const METRICS_ENV: &str = "FASTREFLECT_METRICS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    pub collect_metrics: bool,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self {
            collect_metrics: env::var(METRICS_ENV)
                .map(|v| Self::is_enabled(&v))
                .unwrap_or(false),
        }
    }

    pub fn with_metrics(mut self, collect_metrics: bool) -> Self {
        self.collect_metrics = collect_metrics;
        self
    }

    fn is_enabled(value: &str) -> bool {
        value == "1" || value.eq_ignore_ascii_case("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_values() {
        assert!(CacheConfig::is_enabled("1"));
        assert!(CacheConfig::is_enabled("TRUE"));
        assert!(!CacheConfig::is_enabled("0"));
        assert!(!CacheConfig::is_enabled(""));
    }

    #[test]
    fn test_default_is_off() {
        assert!(!CacheConfig::default().collect_metrics);
        assert!(CacheConfig::new().with_metrics(true).collect_metrics);
    }
}
