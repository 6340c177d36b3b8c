//! Simulation configuration with documented constants
//!
//! All magic numbers of the spatial index and the behavior states are
//! collected here with explanations of their purpose and how they interact.

use crate::core::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the simulation systems
///
/// Defaults give the standard skirmish pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === RANDOMNESS ===
    /// Seed of the world RNG (idle scan jitter, combat rolls)
    pub seed: u64,

    // === PICKING ===
    /// Step length of the pick ray march (world units)
    ///
    /// Roughly half a grid cell. Smaller steps catch thin entities at
    /// the cost of more samples per pick.
    pub pick_precision: f32,

    /// Height added on top of the terrain bounds when picking
    ///
    /// Entities taller than this above the highest terrain point
    /// cannot be picked from above.
    pub max_entity_height: f32,

    // === SCANNING ===
    /// Default view distance for units without an explicit one
    pub view_distance: f32,

    /// Lower bound of the randomized idle scan interval (seconds)
    pub idle_scan_min: f32,

    /// Upper bound of the randomized idle scan interval (seconds)
    ///
    /// Randomization spreads scans of a large idle army over several ticks.
    pub idle_scan_max: f32,

    /// Interval at which attackers of a building look for unit targets (seconds)
    pub attack_arbitrate_interval: f32,

    // === HARVESTING ===
    /// Radius searched for an alternative tree or goldmine
    pub resource_search_radius: f32,

    /// Maximum simultaneous harvesters on a tree
    pub max_peons_per_tree: u32,

    /// Maximum simultaneous harvesters inside a goldmine
    pub max_peons_per_goldmine: u32,

    /// Lumber taken per harvest hit
    pub lumber_per_hit: u32,

    /// Gold taken per goldmine visit
    pub gold_per_visit: u32,

    /// Seconds a worker spends inside a goldmine
    pub goldmine_work_time: f32,

    /// Normalized time of the harvest clip at which the axe hits
    pub harvest_hit_time: f32,

    // === CONSTRUCTION ===
    /// Extra build speed contributed by every builder after the first
    ///
    /// At 0.5, three builders work at 2x the speed of one.
    pub builder_tradeoff: f32,

    /// Fraction of max health restored per construction time while repairing
    pub repair_rate: f32,

    // === DEATH ===
    /// Depth a corpse sinks into the ground before removal
    pub sink_depth: f32,

    /// Sinking speed (world units per second)
    pub sink_speed: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,

            // Picking
            pick_precision: 5.0,
            max_entity_height: 1000.0,

            // Scanning
            view_distance: 100.0,
            idle_scan_min: 1.0,
            idle_scan_max: 2.0,
            attack_arbitrate_interval: 1.0,

            // Harvesting
            resource_search_radius: 500.0,
            max_peons_per_tree: 2,
            max_peons_per_goldmine: 1,
            lumber_per_hit: 1,
            gold_per_visit: 10,
            goldmine_work_time: 1.0,
            harvest_hit_time: 13.0 / 20.0,

            // Construction
            builder_tradeoff: 0.5,
            repair_rate: 0.2,

            // Death
            sink_depth: 5.0,
            sink_speed: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate().map_err(SimError::InvalidConfig)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.pick_precision <= 0.0 {
            return Err(format!(
                "pick_precision ({}) must be positive",
                self.pick_precision
            ));
        }

        // Scan interval bounds should be ordered
        if self.idle_scan_min <= 0.0 || self.idle_scan_min >= self.idle_scan_max {
            return Err(format!(
                "idle_scan_min ({}) should be positive and < idle_scan_max ({})",
                self.idle_scan_min, self.idle_scan_max
            ));
        }

        if self.max_peons_per_tree == 0 || self.max_peons_per_goldmine == 0 {
            return Err("Harvester caps must be at least 1".into());
        }

        if !(0.0..=1.0).contains(&self.harvest_hit_time) {
            return Err(format!(
                "harvest_hit_time ({}) must be a normalized clip time",
                self.harvest_hit_time
            ));
        }

        if self.sink_speed <= 0.0 || self.goldmine_work_time < 0.0 {
            return Err("Rates and durations must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_peons_per_tree, 2);
        assert_eq!(config.max_peons_per_goldmine, 1);
    }

    #[test]
    fn test_invalid_scan_interval() {
        let config = SimulationConfig {
            idle_scan_min: 3.0,
            idle_scan_max: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_overrides_keep_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7
            max_peons_per_tree = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_peons_per_tree, 3);
        assert!((config.pick_precision - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        let result = SimulationConfig::from_toml_str("max_peons_per_goldmine = 0");
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }
}
