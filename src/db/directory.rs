//! Read-only patient directory.

use chrono::NaiveDate;
use once_cell::sync::Lazy;

use crate::models::patient::{PatientBaseline, PatientRecord, SeverityTier};

pub trait PatientDirectory: Send + Sync {
    fn get(&self, patient_id: &str) -> Option<PatientRecord>;

    /// Every known patient, ordered by id.
    fn all(&self) -> Vec<PatientRecord>;
}

/// Fixed roster held in memory.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    patients: Vec<PatientRecord>,
}

impl StaticDirectory {
    pub fn new(mut patients: Vec<PatientRecord>) -> Self {
        patients.sort_by(|a, b| a.id.cmp(&b.id));
        Self { patients }
    }

    /// Eight-bed demo ward.
    pub fn demo() -> Self {
        Self::new(DEMO_ROSTER.clone())
    }
}

impl PatientDirectory for StaticDirectory {
    fn get(&self, patient_id: &str) -> Option<PatientRecord> {
        self.patients.iter().find(|p| p.id == patient_id).cloned()
    }

    fn all(&self) -> Vec<PatientRecord> {
        self.patients.clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    id: &str,
    name: &str,
    age: u32,
    bed: &str,
    admitted: (i32, u32, u32),
    severity: u8,
    sodium: f64,
    bmi: f64,
    baseline: [f64; 6],
) -> PatientRecord {
    let [hr, spo2, sbp, dbp, rr, temp] = baseline;
    PatientRecord {
        id: id.to_string(),
        name: name.to_string(),
        age,
        bed: bed.to_string(),
        admit_date: NaiveDate::from_ymd_opt(admitted.0, admitted.1, admitted.2).unwrap_or_default(),
        severity: SeverityTier::from_level(severity),
        sodium,
        bmi,
        baseline: PatientBaseline { hr, spo2, sbp, dbp, rr, temp },
    }
}

static DEMO_ROSTER: Lazy<Vec<PatientRecord>> = Lazy::new(|| {
    vec![
        record("P001", "Arjun Mehta", 67, "B01", (2026, 2, 20), 2, 143.0, 28.4, [70.0, 97.0, 118.0, 78.0, 15.0, 36.7]),
        record("P002", "Priya Sharma", 54, "B02", (2026, 2, 22), 1, 140.0, 26.1, [74.0, 98.0, 122.0, 82.0, 17.0, 36.9]),
        record("P003", "Ravi Kumar", 71, "B03", (2026, 2, 18), 2, 147.0, 31.2, [68.0, 96.0, 115.0, 76.0, 14.0, 36.6]),
        record("P004", "Seetha Nair", 45, "B04", (2026, 2, 24), 0, 139.0, 23.8, [76.0, 99.0, 125.0, 83.0, 18.0, 37.0]),
        record("P005", "Karthik Bose", 59, "B05", (2026, 2, 21), 1, 141.0, 27.3, [72.0, 97.0, 119.0, 79.0, 16.0, 36.8]),
        record("P006", "Meena Pillai", 63, "B06", (2026, 2, 23), 0, 138.0, 25.0, [71.0, 98.0, 121.0, 81.0, 16.0, 36.7]),
        record("P007", "Vijay Reddy", 78, "B07", (2026, 2, 19), 1, 146.0, 29.5, [69.0, 95.0, 113.0, 74.0, 15.0, 36.5]),
        record("P008", "Anitha Joseph", 50, "B08", (2026, 2, 25), 0, 137.0, 22.9, [75.0, 99.0, 123.0, 82.0, 17.0, 36.9]),
    ]
});
