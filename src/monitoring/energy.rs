//! Pump energy accounting: renewable offset and carbon footprint.

use serde::{Deserialize, Serialize};

/// Grid carbon intensity in kg CO2 per kWh.
pub const DEFAULT_CARBON_INTENSITY: f64 = 0.233;

/// Renewable energy generated on site during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenewableGeneration {
    pub solar_kwh: f64,
    pub wind_kwh: f64,
}

impl RenewableGeneration {
    pub fn total_kwh(&self) -> f64 {
        self.solar_kwh + self.wind_kwh
    }
}

/// Energy balance for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub consumed_kwh: f64,
    pub solar_kwh: f64,
    pub wind_kwh: f64,
    /// Energy still drawn from the grid after the renewable offset
    pub grid_kwh: f64,
    pub carbon_kg: f64,
}

impl EnergySample {
    /// Balance consumption against renewable generation.
    pub fn compute(
        consumed_kwh: f64,
        generation: RenewableGeneration,
        carbon_intensity: f64,
    ) -> Self {
        let grid_kwh = remaining_after_offset(consumed_kwh, generation.total_kwh());
        Self {
            consumed_kwh,
            solar_kwh: generation.solar_kwh,
            wind_kwh: generation.wind_kwh,
            grid_kwh,
            carbon_kg: carbon_footprint(grid_kwh, carbon_intensity),
        }
    }
}

/// Energy left to buy after renewables, never negative.
pub fn remaining_after_offset(consumed_kwh: f64, renewable_kwh: f64) -> f64 {
    (consumed_kwh - renewable_kwh).max(0.0)
}

/// Carbon emitted by `kwh` of grid energy.
pub fn carbon_footprint(kwh: f64, carbon_intensity: f64) -> f64 {
    kwh * carbon_intensity
}

/// Running totals over a session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyLedger {
    pub ticks: u64,
    pub consumed_kwh: f64,
    pub renewable_kwh: f64,
    pub grid_kwh: f64,
    pub carbon_kg: f64,
}

impl EnergyLedger {
    pub fn record(&mut self, sample: &EnergySample) {
        self.ticks += 1;
        self.consumed_kwh += sample.consumed_kwh;
        self.renewable_kwh += sample.solar_kwh + sample.wind_kwh;
        self.grid_kwh += sample.grid_kwh;
        self.carbon_kg += sample.carbon_kg;
    }
}
