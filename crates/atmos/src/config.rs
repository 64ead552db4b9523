use serde::{Deserialize, Serialize};

/// Tuning for the atmosphere pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosConfig {
    /// Minimum simulated seconds between passes.
    pub process_interval: f64,
    /// Per-second equalize rate with each open neighbor.
    pub diffusion_rate: f64,
    /// Per-second rate of the extra neighbor temperature exchange that runs
    /// after diffusion. `0` disables it.
    pub conduction_rate: f64,
    pub fire: FireConfig,
}

impl Default for AtmosConfig {
    fn default() -> Self {
        Self {
            process_interval: 0.1,
            diffusion_rate: 0.1,
            conduction_rate: 0.0,
            fire: FireConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    /// Fire temperature set on ignition; the fire goes out at or below it.
    pub ignition_temperature: f64,
    /// Fraction of each flammable gas burnt per second.
    pub burn_rate: f64,
    /// Fire temperature gained per mole burnt.
    pub heat_per_mole: f64,
    /// Fire temperature lost per second.
    pub decay_rate: f64,
    /// Kelvin per second the air moves toward the fire temperature.
    pub heating_rate: f64,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            ignition_temperature: 400.0,
            burn_rate: 2.0,
            heat_per_mole: 100.0,
            decay_rate: 10.0,
            heating_rate: 5.0,
        }
    }
}
