//! Synthetic helmet status. Nothing here is read from real hardware.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::device::Coordinates;

pub const INITIAL_BATTERY_LEVEL: f64 = 85.0;
pub const BATTERY_FLOOR: f64 = 20.0;
pub const MAX_DECAY_STEP: f64 = 0.5;
pub const DECAY_INTERVAL: Duration = Duration::from_secs(30);

/// The helmet link is simulated and never drops.
pub const CONNECTED: bool = true;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryBand {
    Good,
    Low,
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Battery {
    level: f64,
}

impl Battery {
    pub fn new(level: f64) -> Self {
        Self { level }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Drains `amount` percent, never below [`BATTERY_FLOOR`].
    pub fn decay(&mut self, amount: f64) -> f64 {
        self.level = (self.level - amount).max(BATTERY_FLOOR);
        self.level
    }

    /// One timer tick: a uniform drain in `[0, MAX_DECAY_STEP)`.
    pub fn decay_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let amount = rng.random::<f64>() * MAX_DECAY_STEP;
        self.decay(amount)
    }

    pub fn band(&self) -> BatteryBand {
        if self.level > 50.0 {
            BatteryBand::Good
        } else if self.level > BATTERY_FLOOR {
            BatteryBand::Low
        } else {
            BatteryBand::Critical
        }
    }
}

impl Default for Battery {
    fn default() -> Self {
        Self::new(INITIAL_BATTERY_LEVEL)
    }
}

/// What the status card shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HelmetStatus {
    pub connected: bool,
    pub battery_level: f64,
    /// Rounded the way the card displays it.
    pub battery_percent: u8,
    pub battery_band: BatteryBand,
    pub monitoring: bool,
    pub location: Option<Coordinates>,
    pub location_denied: bool,
    pub trigger_enabled: bool,
}
