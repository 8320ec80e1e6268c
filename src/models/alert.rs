use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::patient::PatientRef;
use super::vitals::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(Uuid);

impl AlertId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "channel")]
pub enum AlertKind {
    Threshold,
    Spike,
    Channel(Channel),
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Threshold => f.write_str("THRESHOLD"),
            AlertKind::Spike => f.write_str("SPIKE"),
            AlertKind::Channel(channel) => write!(f, "{}", channel),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub patient: PatientRef,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub risk_score: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub suppressed: bool,
    pub suppression_reason: Option<String>,
    pub suppressed_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        patient: PatientRef,
        kind: AlertKind,
        severity: AlertSeverity,
        message: impl Into<String>,
        risk_score: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            patient,
            kind,
            severity,
            message: message.into(),
            risk_score,
            confidence,
            timestamp,
            suppressed: false,
            suppression_reason: None,
            suppressed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub triggered: usize,
    pub suppressed: usize,
}
