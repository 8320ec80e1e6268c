//! Global risk path: simulation, features, prediction, triage and forecast.

pub mod ambient;
pub mod classifier;
pub mod features;
pub mod forecast;
pub mod model;
pub mod predictor;
pub mod simulator;

pub use ambient::Ambient;
pub use classifier::RiskTier;
pub use features::{engineer_features, FeatureVector};
pub use predictor::{Prediction, RiskPredictor};
pub use simulator::VitalsSimulator;
