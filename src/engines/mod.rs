//! Per-vital clinical reasoning engines.
//!
//! Each channel is a [`profile::ChannelProfile`] table driven through the
//! shared pipeline in [`pipeline`]. [`global`] runs all five for one reading.

pub mod blood_pressure;
pub mod global;
pub mod heart_rate;
pub mod oxygen_saturation;
pub mod pipeline;
pub mod profile;
pub mod respiration;
pub mod temperature;

pub use global::{ChannelEngines, GlobalReport};
pub use pipeline::{ChannelReport, VitalEngine};
pub use profile::{ChannelProfile, Signal};

use crate::models::vitals::Channel;

/// Static configuration for one channel.
pub fn profile_for(channel: Channel) -> ChannelProfile {
    match channel {
        Channel::BloodPressure => blood_pressure::PROFILE,
        Channel::HeartRate => heart_rate::PROFILE,
        Channel::Respiration => respiration::PROFILE,
        Channel::OxygenSaturation => oxygen_saturation::PROFILE,
        Channel::Temperature => temperature::PROFILE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_channel_has_a_matching_profile() {
        for channel in Channel::ALL {
            let profile = profile_for(channel);
            assert_eq!(profile.channel, channel);
            assert!(profile.max_score > 0.0);
            let last = profile.stages.last().expect("default stage");
            assert!(last.triggers.is_empty() && last.risk_gate.is_none());
        }
    }

    #[test]
    fn every_prescribed_item_has_an_effect_entry() {
        for channel in Channel::ALL {
            let profile = profile_for(channel);
            for stage in profile.stages {
                for item in stage.primary.iter().chain(stage.alternative) {
                    assert!(profile.effect(item.name).is_some(), "{channel}: {}", item.name);
                }
            }
        }
    }
}
