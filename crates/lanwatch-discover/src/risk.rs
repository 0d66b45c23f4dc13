//! Device risk classification.
//!
//! `high`: any vulnerability, or any open port in the high-risk table.
//! `medium`: more than `medium_threshold` open ports in the medium-risk table.
//! `low`: everything else.
//!
//! The high check always runs first.

use std::collections::BTreeSet;

use lanwatch_core::RiskTier;

use crate::config::RiskConfig;

/// Pure classifier over configurable port tables.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    high_risk_ports: BTreeSet<u16>,
    medium_risk_ports: BTreeSet<u16>,
    medium_threshold: usize,
}

impl RiskClassifier {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            high_risk_ports: config.high_risk_ports.iter().copied().collect(),
            medium_risk_ports: config.medium_risk_ports.iter().copied().collect(),
            medium_threshold: config.medium_threshold,
        }
    }

    pub fn classify(&self, open_ports: &[u16], vulnerabilities: &[String]) -> RiskTier {
        if !vulnerabilities.is_empty()
            || open_ports.iter().any(|p| self.high_risk_ports.contains(p))
        {
            return RiskTier::High;
        }

        let medium_hits = open_ports
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|p| self.medium_risk_ports.contains(*p))
            .count();

        if medium_hits > self.medium_threshold {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(&RiskConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(ports: &[u16], vulns: &[&str]) -> RiskTier {
        let vulns: Vec<String> = vulns.iter().map(|v| v.to_string()).collect();
        RiskClassifier::default().classify(ports, &vulns)
    }

    #[test]
    fn test_high_risk_port() {
        assert_eq!(classify(&[445], &[]), RiskTier::High);
        assert_eq!(classify(&[80, 443, 3389], &[]), RiskTier::High);
    }

    #[test]
    fn test_vulnerability_alone_is_high() {
        assert_eq!(classify(&[], &["CVE-x"]), RiskTier::High);
    }

    #[test]
    fn test_medium_needs_more_than_two() {
        assert_eq!(classify(&[80, 443, 993], &[]), RiskTier::Medium);
        assert_eq!(classify(&[80, 443], &[]), RiskTier::Low);
        assert_eq!(classify(&[80], &[]), RiskTier::Low);
    }

    #[test]
    fn test_high_check_precedes_medium() {
        assert_eq!(classify(&[22, 80, 443, 993, 23], &[]), RiskTier::High);
    }

    #[test]
    fn test_duplicate_ports_counted_once() {
        assert_eq!(classify(&[80, 80, 80], &[]), RiskTier::Low);
    }

    #[test]
    fn test_empty_is_low() {
        assert_eq!(classify(&[], &[]), RiskTier::Low);
    }

    #[test]
    fn test_custom_tables() {
        let classifier = RiskClassifier::new(&RiskConfig {
            high_risk_ports: vec![6379],
            medium_risk_ports: vec![80],
            medium_threshold: 0,
        });
        assert_eq!(classifier.classify(&[6379], &[]), RiskTier::High);
        assert_eq!(classifier.classify(&[445], &[]), RiskTier::Low);
        assert_eq!(classifier.classify(&[80], &[]), RiskTier::Medium);
    }
}
