//! Configuration management for simulation parameters.
//!
//! Strongly-typed sections that map onto a TOML file. Every field has a default, so a
//! file only needs to name what it overrides.
//!
//! ## Example `mitosis.toml`
//!
//! ```toml
//! [timing]
//! full_ms = 5000
//! starve_timeout_ms = 4000
//!
//! [population]
//! initial_asexual = 2
//! initial_sexual = 2
//!
//! [food]
//! initial_food = 20
//! seed = 42
//! ```

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Durations (milliseconds of simulated time) and thresholds of the cell loop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause between two iterations of a cell loop.
    pub tick_ms: u64,
    /// How long a fed cell stays full.
    pub full_ms: u64,
    /// How long a hungry cell waits for food before starving. Not affected by speed.
    pub starve_timeout_ms: u64,
    /// Delay before an asexual cell divides.
    pub division_delay_ms: u64,
    /// Delay before each partner search of a sexual cell.
    pub mating_delay_ms: u64,
    /// Floor applied to every scaled delay.
    pub min_delay_ms: u64,
    pub mating_attempts: u32,
    pub meals_to_reproduce: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            full_ms: 5000,
            starve_timeout_ms: 4000,
            division_delay_ms: 1000,
            mating_delay_ms: 1000,
            min_delay_ms: 10,
            mating_attempts: 5,
            meals_to_reproduce: 2,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn starve_timeout(&self) -> Duration {
        Duration::from_millis(self.starve_timeout_ms)
    }
}

/// Cells placed when a run starts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    pub initial_asexual: usize,
    pub initial_sexual: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_asexual: 2,
            initial_sexual: 2,
        }
    }
}

/// Food bank settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FoodConfig {
    pub initial_food: u64,
    /// Smallest amount a corpse leaves behind.
    pub scavenge_min: u64,
    /// Largest amount a corpse leaves behind.
    pub scavenge_max: u64,
    /// Seed for the scavenging RNG; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            initial_food: 20,
            scavenge_min: 1,
            scavenge_max: 5,
            seed: None,
        }
    }
}

/// Connection settings for the language-model summary service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Run records kept in memory for summaries.
    pub history_size: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            model: "qwen/qwen3-8b".to_string(),
            temperature: 0.3,
            max_tokens: 300,
            timeout_secs: 60,
            history_size: 50,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub timing: TimingConfig,
    pub population: PopulationConfig,
    pub food: FoodConfig,
    pub summary: SummaryConfig,
    /// Buffered lifecycle events per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            population: PopulationConfig::default(),
            food: FoodConfig::default(),
            summary: SummaryConfig::default(),
            event_capacity: 1024,
        }
    }
}

impl SimConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description of the
    /// first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.timing;
        anyhow::ensure!(t.tick_ms > 0, "Tick duration must be positive");
        anyhow::ensure!(t.full_ms > 0, "Full duration must be positive");
        anyhow::ensure!(
            t.starve_timeout_ms > 0,
            "Starvation timeout must be positive"
        );
        anyhow::ensure!(t.min_delay_ms > 0, "Delay floor must be positive");
        anyhow::ensure!(t.mating_attempts > 0, "Mating attempts must be positive");
        anyhow::ensure!(
            t.meals_to_reproduce > 0,
            "Meals to reproduce must be positive"
        );

        anyhow::ensure!(
            self.population.initial_asexual + self.population.initial_sexual <= 10_000,
            "Initial population too large (max 10000)"
        );

        anyhow::ensure!(
            self.food.scavenge_min <= self.food.scavenge_max,
            "Scavenge range is empty ({} > {})",
            self.food.scavenge_min,
            self.food.scavenge_max
        );

        anyhow::ensure!(
            (0.0..=2.0).contains(&self.summary.temperature),
            "Summary temperature must be within [0.0, 2.0]"
        );
        anyhow::ensure!(
            self.summary.history_size > 0,
            "Summary history size must be positive"
        );
        anyhow::ensure!(self.event_capacity > 0, "Event capacity must be positive");
        Ok(())
    }

    /// Reads and validates a config file, applying `LM_STUDIO_URL` on top.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SimError::from(e).with_context(format!("reading {}", path.display())))?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        config
            .validate()
            .map_err(|e| SimError::config(e.to_string()))?;
        Ok(config)
    }

    /// Loads `path`, or writes the defaults there when it does not exist yet.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "Wrote default configuration");
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("LM_STUDIO_URL") {
            if !url.trim().is_empty() {
                self.summary.base_url = url;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_defaults_match_the_cell_clock() {
        let timing = TimingConfig::default();
        assert_eq!(timing.full_ms, 5000);
        assert_eq!(timing.starve_timeout_ms, 4000);
        assert_eq!(timing.meals_to_reproduce, 2);
        assert_eq!(timing.mating_attempts, 5);
        assert_eq!(timing.min_delay_ms, 10);
    }

    #[test]
    fn test_empty_scavenge_range_is_rejected() {
        let mut config = SimConfig::default();
        config.food.scavenge_min = 6;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Scavenge range"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            [food]
            initial_food = 99

            [timing]
            tick_ms = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.food.initial_food, 99);
        assert_eq!(config.food.scavenge_max, 5);
        assert_eq!(config.timing.tick_ms, 5);
        assert_eq!(config.timing.full_ms, 5000);
        assert_eq!(config.population.initial_sexual, 2);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("mitosis-config-{}.toml", std::process::id()));
        let mut config = SimConfig::default();
        config.food.seed = Some(7);
        config.population.initial_asexual = 5;
        config.save(&path).unwrap();

        let loaded = SimConfig::load(&path).unwrap();
        assert_eq!(loaded.food.seed, Some(7));
        assert_eq!(loaded.population.initial_asexual, 5);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = SimConfig::load("/definitely/not/here/mitosis.toml").unwrap_err();
        assert!(err.to_string().contains("mitosis.toml"));
    }
}
