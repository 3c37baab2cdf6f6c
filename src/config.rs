//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides. The binary reads the file named by [`CONFIG_ENV_VAR`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::Money;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "BOOKING_CONFIG";
/// Environment variable for the log filter.
pub const LOG_ENV_VAR: &str = "BOOKING_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub currency: String,
    pub flight: FlightConfig,
    pub hotel: HotelConfig,
    pub local_service: LocalServiceConfig,
    pub food: FoodConfig,
    pub rating: RatingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            flight: FlightConfig::default(),
            hotel: HotelConfig::default(),
            local_service: LocalServiceConfig::default(),
            food: FoodConfig::default(),
            rating: RatingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub reschedule_fee: Money,
    /// Web check-in opens this many hours before departure.
    pub check_in_opens_hours: i64,
    /// Web check-in closes this many hours before departure.
    pub check_in_closes_hours: i64,
    pub boarding_closes_minutes: i64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            reschedule_fee: Money::from_major(3_000),
            check_in_opens_hours: 48,
            check_in_closes_hours: 1,
            boarding_closes_minutes: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelConfig {
    pub modification_fee: Money,
}

impl Default for HotelConfig {
    fn default() -> Self {
        Self {
            modification_fee: Money::from_major(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalServiceConfig {
    pub reschedule_fee: Money,
}

impl Default for LocalServiceConfig {
    fn default() -> Self {
        Self {
            reschedule_fee: Money::from_major(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    /// Flat fee once the kitchen has been working past the free window.
    pub cancellation_fee: Money,
    pub free_cancellation_minutes: i64,
    pub confirm_delay_minutes: i64,
    pub preparation_minutes: i64,
    pub transit_minutes: i64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            cancellation_fee: Money::from_major(50),
            free_cancellation_minutes: 10,
            confirm_delay_minutes: 3,
            preparation_minutes: 20,
            transit_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub points_per_star: u32,
    /// Extra points when the rating carries written feedback.
    pub feedback_bonus: u32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            points_per_star: 10,
            feedback_bonus: 20,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`], or defaults when unset.
    pub fn from_env() -> Result<Self, Error> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let fees = [
            ("flight.reschedule_fee", self.flight.reschedule_fee),
            ("hotel.modification_fee", self.hotel.modification_fee),
            ("local_service.reschedule_fee", self.local_service.reschedule_fee),
            ("food.cancellation_fee", self.food.cancellation_fee),
        ];
        if let Some((name, _)) = fees.iter().find(|(_, fee)| fee.is_negative()) {
            return Err(Error::Config {
                reason: format!("{name} must not be negative"),
            });
        }
        let durations = [
            ("food.free_cancellation_minutes", self.food.free_cancellation_minutes),
            ("food.confirm_delay_minutes", self.food.confirm_delay_minutes),
            ("food.preparation_minutes", self.food.preparation_minutes),
            ("food.transit_minutes", self.food.transit_minutes),
            ("flight.check_in_closes_hours", self.flight.check_in_closes_hours),
            ("flight.boarding_closes_minutes", self.flight.boarding_closes_minutes),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value < 0) {
            return Err(Error::Config {
                reason: format!("{name} must not be negative"),
            });
        }
        if self.flight.check_in_opens_hours <= self.flight.check_in_closes_hours {
            return Err(Error::Config {
                reason: "flight check-in must open before it closes".to_string(),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Config {
                reason: "currency must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
