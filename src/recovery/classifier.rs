//! Failure pattern detection.
//!
//! A heuristic over recent failure records. False positives only add extra
//! remediation steps.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::vcs::FailureRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePattern {
    Timeout,
    Dependency,
    Resource,
}

impl FailurePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePattern::Timeout => "timeout",
            FailurePattern::Dependency => "dependency",
            FailurePattern::Resource => "resource",
        }
    }
}

impl fmt::Display for FailurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag `records` with every pattern whose threshold is met.
///
/// Matching is case-insensitive.
pub fn classify(records: &[FailureRecord], config: &ClassifierConfig) -> BTreeSet<FailurePattern> {
    let keywords: Vec<String> = config
        .dependency_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();

    let timeouts = records
        .iter()
        .filter(|r| r.conclusion.to_lowercase().contains("timeout"))
        .count();

    let dependency = records
        .iter()
        .filter(|r| {
            let message = r.commit_message.to_lowercase();
            keywords.iter().any(|k| message.contains(k.as_str()))
        })
        .count();

    let mut patterns = BTreeSet::new();
    if timeouts >= config.timeout_threshold {
        patterns.insert(FailurePattern::Timeout);
    }
    if dependency >= config.dependency_threshold {
        patterns.insert(FailurePattern::Dependency);
    }
    if records.len() >= config.resource_threshold {
        patterns.insert(FailurePattern::Resource);
    }

    tracing::debug!(
        records = records.len(),
        timeouts,
        dependency,
        patterns = ?patterns,
        "Classified failure history"
    );
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(conclusion: &str, message: &str) -> FailureRecord {
        FailureRecord {
            timestamp: Utc::now(),
            conclusion: conclusion.to_string(),
            commit_message: message.to_string(),
        }
    }

    #[test]
    fn test_empty_history() {
        assert!(classify(&[], &ClassifierConfig::default()).is_empty());
    }

    #[test]
    fn test_timeout_pattern() {
        let records = vec![
            record("timeout", "fix typo"),
            record("Job TIMEOUT exceeded", "docs"),
        ];
        let patterns = classify(&records, &ClassifierConfig::default());
        assert_eq!(patterns, BTreeSet::from([FailurePattern::Timeout]));
    }

    #[test]
    fn test_single_timeout_is_not_a_pattern() {
        let records = vec![record("timeout", ""), record("failure", "")];
        assert!(classify(&records, &ClassifierConfig::default()).is_empty());
    }

    #[test]
    fn test_dependency_pattern() {
        let records = vec![
            record("failure", "Bump NPM lockfile"),
            record("failure", "update pip requirements"),
        ];
        let patterns = classify(&records, &ClassifierConfig::default());
        assert!(patterns.contains(&FailurePattern::Dependency));
        assert!(!patterns.contains(&FailurePattern::Resource));
    }

    #[test]
    fn test_resource_pattern_from_volume() {
        let records = vec![record("failure", ""), record("failure", ""), record("failure", "")];
        let patterns = classify(&records, &ClassifierConfig::default());
        assert_eq!(patterns, BTreeSet::from([FailurePattern::Resource]));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ClassifierConfig {
            timeout_threshold: 1,
            dependency_keywords: vec!["cargo".to_string()],
            dependency_threshold: 1,
            ..Default::default()
        };
        let records = vec![record("timeout", "cargo update")];
        let patterns = classify(&records, &config);
        assert!(patterns.contains(&FailurePattern::Timeout));
        assert!(patterns.contains(&FailurePattern::Dependency));
    }
}
