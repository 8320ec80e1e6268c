use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Healthy reference values for one patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientBaseline {
    pub hr: f64,
    pub spo2: f64,
    pub sbp: f64,
    pub dbp: f64,
    pub rr: f64,
    pub temp: f64,
}

impl Default for PatientBaseline {
    fn default() -> Self {
        Self {
            hr: 72.0,
            spo2: 98.0,
            sbp: 120.0,
            dbp: 80.0,
            rr: 16.0,
            temp: 36.8,
        }
    }
}

/// Simulated acuity used to condition the vitals generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Stable,
    Moderate,
    Critical,
}

impl SeverityTier {
    pub fn index(self) -> usize {
        match self {
            SeverityTier::Stable => 0,
            SeverityTier::Moderate => 1,
            SeverityTier::Critical => 2,
        }
    }

    /// Unknown levels saturate at `Critical`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => SeverityTier::Stable,
            1 => SeverityTier::Moderate,
            _ => SeverityTier::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub bed: String,
    pub admit_date: NaiveDate,
    pub severity: SeverityTier,
    /// Serum sodium, mmol/L.
    pub sodium: f64,
    pub bmi: f64,
    pub baseline: PatientBaseline,
}

impl PatientRecord {
    pub fn reference(&self) -> PatientRef {
        PatientRef {
            id: self.id.clone(),
            name: self.name.clone(),
            bed: self.bed.clone(),
        }
    }

    pub fn context(&self) -> ClinicalContext {
        ClinicalContext {
            age: f64::from(self.age),
            sodium: self.sodium,
            bmi: self.bmi,
            resting_hr: None,
        }
    }
}

/// The identifying slice of a patient carried on alerts and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: String,
    pub name: String,
    pub bed: String,
}

impl PatientRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bed: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bed: bed.into(),
        }
    }
}

/// Non-vital inputs some channels score against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalContext {
    pub age: f64,
    pub sodium: f64,
    pub bmi: f64,
    pub resting_hr: Option<f64>,
}

impl Default for ClinicalContext {
    fn default() -> Self {
        Self {
            age: 50.0,
            sodium: 140.0,
            bmi: 24.0,
            resting_hr: None,
        }
    }
}
