//! Data models shared across the simulator, the engines and the ward.

pub mod alert;
pub mod patient;
pub mod vitals;

pub use alert::{Alert, AlertCounts, AlertId, AlertKind, AlertSeverity};
pub use patient::{ClinicalContext, PatientBaseline, PatientRecord, PatientRef, SeverityTier};
pub use vitals::{Channel, VitalsReading};
