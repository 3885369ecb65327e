//! # Configuration System
//!
//! Tuning for every stage of the synchronization tick, loadable from TOML
//! or RON files.
//!
//! ## Configuration Categories
//!
//! - **Scheduler**: per-tick update time budget and cost averaging
//! - **Containment**: recheck hysteresis for the observer
//! - **Priority**: weights of the ranked-update metric
//! - **Octree**: bounds and subdivision of the entity tree index

use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Update Scheduler Configuration
///
/// Time budget of the per-tick renderable update pass. All durations are
/// microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Total time allotted to Automatic updates in one tick
    pub max_update_time_budget_us: u64,
    /// Floor for the ranked pass when sorting already ate into the budget
    pub min_sorted_update_time_budget_us: u64,
    /// Weight of the newest observation in the running cost average
    pub cost_blend: f32,
    /// Starting value of the running per-renderable cost average
    pub initial_update_cost_us: f32,
    /// Deferrals after which a renderable is ranked ahead of everything else
    pub starvation_passes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_update_time_budget_us: 2_000,
            min_sorted_update_time_budget_us: 1_000,
            cost_blend: 0.1,
            initial_update_cost_us: 0.0,
            starvation_passes: 30,
        }
    }
}

impl SchedulerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_update_time_budget_us == 0 {
            return Err(ConfigError::Invalid("max update time budget must be positive".to_string()));
        }
        if self.min_sorted_update_time_budget_us > self.max_update_time_budget_us {
            return Err(ConfigError::Invalid(
                "min sorted update budget cannot exceed the max update budget".to_string(),
            ));
        }
        if !(self.cost_blend > 0.0 && self.cost_blend <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cost blend must be in (0, 1], got {}",
                self.cost_blend
            )));
        }
        if self.initial_update_cost_us < 0.0 {
            return Err(ConfigError::Invalid("initial update cost cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// # Containment Configuration
///
/// When the observer's inside/outside state is recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainmentConfig {
    /// Displacement (meters) since the last recheck that triggers a new one
    pub check_distance: f32,
    /// Elapsed time (microseconds) since the last recheck that triggers a new one
    pub check_interval_us: u64,
    /// Radius of the coarse spatial prefilter around the observer
    pub query_radius: f32,
}

impl Default for ContainmentConfig {
    fn default() -> Self {
        Self {
            check_distance: 0.001,
            check_interval_us: 100 * crate::foundation::time::USECS_PER_MSEC,
            query_radius: 0.01,
        }
    }
}

impl ContainmentConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_distance < 0.0 {
            return Err(ConfigError::Invalid("check distance cannot be negative".to_string()));
        }
        if self.query_radius <= 0.0 {
            return Err(ConfigError::Invalid("containment query radius must be positive".to_string()));
        }
        Ok(())
    }
}

/// # Priority Weights
///
/// Coefficients of the ranked update metric:
/// `(angular * size / distance + center * cos) * (age + 1) + age_weight * age`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    /// Weight of apparent angular size
    pub angular: f32,
    /// Weight of closeness to the view direction
    pub center: f32,
    /// Weight of time since last update (seconds)
    pub age: f32,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            angular: 1.0,
            center: 0.5,
            age: 0.25,
        }
    }
}

/// # Octree Settings
///
/// Bounds and subdivision policy of the entity tree's spatial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeSettings {
    /// Half extent of the cubic world volume centered on the origin
    pub world_half_extent: f32,
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,
    /// Maximum subdivision depth
    pub max_depth: u32,
    /// Minimum node half size
    pub min_node_size: f32,
    /// Longest parent chain walked when checking that a parent path resolves
    pub max_parent_depth: usize,
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            // Half of the 32768m tree scale
            world_half_extent: 16_384.0,
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
            max_parent_depth: 29,
        }
    }
}

impl OctreeSettings {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world_half_extent <= 0.0 {
            return Err(ConfigError::Invalid("world half extent must be positive".to_string()));
        }
        if self.max_entities_per_node == 0 {
            return Err(ConfigError::Invalid("octree nodes must hold at least one entity".to_string()));
        }
        Ok(())
    }
}

/// # Complete Synchronization Configuration
///
/// Top-level configuration handed to the tree renderer and the entity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Update scheduler tuning
    pub scheduler: SchedulerConfig,
    /// Containment recheck tuning
    pub containment: ContainmentConfig,
    /// Ranked update weights
    pub priority: PriorityWeights,
    /// Entity tree index settings
    pub octree: OctreeSettings,
    /// Whether entity scripts are loaded and notified
    pub want_scripts: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            containment: ContainmentConfig::default(),
            priority: PriorityWeights::default(),
            octree: OctreeSettings::default(),
            want_scripts: true,
        }
    }
}

impl SyncConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.containment.validate()?;
        self.octree.validate()?;
        Ok(())
    }
}

impl Config for SyncConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.max_update_time_budget_us, 2_000);
        assert_eq!(config.containment.check_interval_us, 100_000);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: SyncConfig = toml::from_str(
            "want_scripts = false\n[scheduler]\nmax_update_time_budget_us = 4000\n",
        )
        .expect("partial config should parse");

        assert!(!config.want_scripts);
        assert_eq!(config.scheduler.max_update_time_budget_us, 4_000);
        assert_eq!(config.scheduler.min_sorted_update_time_budget_us, 1_000);
        assert_eq!(config.containment, ContainmentConfig::default());
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("scene_sync_config_{}.ron", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut config = SyncConfig::default();
        config.containment.check_distance = 0.5;
        config.save_to_file(&path).expect("save should succeed");

        let loaded = SyncConfig::load_from_file(&path).expect("load should succeed");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = SyncConfig::default();
        config.scheduler.cost_blend = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SyncConfig::default();
        config.scheduler.min_sorted_update_time_budget_us = 5_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let result = SyncConfig::load_from_file("settings.yaml");
        // The read fails first when the file does not exist
        assert!(matches!(result, Err(ConfigError::Io(_)) | Err(ConfigError::UnsupportedFormat(_))));
    }
}
