//! Three-tier triage classification of a global risk score.

use serde::{Deserialize, Serialize};

pub const MEDIUM_THRESHOLD: f64 = 40.0;
pub const HIGH_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score < MEDIUM_THRESHOLD {
            RiskTier::Low
        } else if score < HIGH_THRESHOLD {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskTier::Low => "green",
            RiskTier::Medium => "yellow",
            RiskTier::High => "red",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            RiskTier::Low => "#22c55e",
            RiskTier::Medium => "#f59e0b",
            RiskTier::High => "#ef4444",
        }
    }
}

/// One row of a ward census.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusEntry {
    pub patient_id: String,
    pub name: String,
    pub bed: String,
    pub risk_score: f64,
    pub tier: RiskTier,
}

/// Order a census by descending risk; ties keep their input order.
pub fn rank_by_risk(entries: &mut [CensusEntry]) {
    entries.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0 => RiskTier::Low)]
    #[test_case(39.9 => RiskTier::Low)]
    #[test_case(40.0 => RiskTier::Medium)]
    #[test_case(69.9 => RiskTier::Medium)]
    #[test_case(70.0 => RiskTier::High)]
    #[test_case(100.0 => RiskTier::High)]
    fn tier_boundaries(score: f64) -> RiskTier {
        RiskTier::from_score(score)
    }

    #[test]
    fn tier_colors() {
        assert_eq!(RiskTier::Low.hex(), "#22c55e");
        assert_eq!(RiskTier::Medium.color(), "yellow");
        assert_eq!(RiskTier::High.hex(), "#ef4444");
    }

    #[test]
    fn census_sorts_descending() {
        let entry = |id: &str, score: f64| CensusEntry {
            patient_id: id.to_string(),
            name: id.to_string(),
            bed: String::new(),
            risk_score: score,
            tier: RiskTier::from_score(score),
        };
        let mut census = vec![entry("P1", 12.0), entry("P2", 88.0), entry("P3", 45.0)];
        rank_by_risk(&mut census);
        let order: Vec<_> = census.iter().map(|e| e.patient_id.as_str()).collect();
        assert_eq!(order, ["P2", "P3", "P1"]);
    }
}
