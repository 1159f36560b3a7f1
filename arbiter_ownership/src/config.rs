//! Simulation scenario configuration.
//!
//! Loaded from a single TOML file through [`ConfigLoader`]. Validation runs
//! once at load time and rejects bad values there rather than mid-run.
//!
//! ```toml
//! [shared]
//! service_name = "arbiter-sim"
//!
//! [simulation]
//! cycle_time_ms = 20
//! iterations = 50
//!
//! [[subsystems]]
//! name = "Elevator"
//!
//! [[routines]]
//! name = "autonomous"
//! owner = "auto1"
//! subsystems = ["Elevator"]
//! hold_cycles = 5
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use arbiter_common::consts::DEFAULT_HOLD_CYCLES;
use arbiter_common::prelude::{
    ConfigError, ConfigLoader, DEFAULT_CYCLE_TIME_MS, MAX_ROUTINES, MAX_SUBSYSTEMS, SharedConfig,
};
use serde::{Deserialize, Serialize};

/// Timing of the simulated control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Period of every routine's loop [ms]. 0 runs unpaced.
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u64,
    /// Loop iterations per routine.
    pub iterations: u32,
}

impl SimulationConfig {
    /// Loop period as Duration.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }
}

fn default_cycle_time_ms() -> u64 {
    DEFAULT_CYCLE_TIME_MS
}

fn default_hold_cycles() -> u32 {
    DEFAULT_HOLD_CYCLES
}

/// A controllable device declared by the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsystemConfig {
    /// Display name, unique within the scenario.
    pub name: String,
}

/// A control routine competing for subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutineConfig {
    /// Routine name, unique within the scenario.
    pub name: String,
    /// Owner token. Omitted for a routine that never claims ownership and
    /// only acts on free subsystems.
    #[serde(default)]
    pub owner: Option<String>,
    /// Subsystems the routine needs all at once.
    pub subsystems: Vec<String>,
    /// Cycles to hold the subsystems once acquired.
    #[serde(default = "default_hold_cycles")]
    pub hold_cycles: u32,
}

/// Complete scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    pub shared: SharedConfig,
    pub simulation: SimulationConfig,
    pub subsystems: Vec<SubsystemConfig>,
    pub routines: Vec<RoutineConfig>,
}

impl SimConfig {
    /// Load and validate a scenario file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a scenario from TOML text.
    pub fn from_toml_validated(content: &str) -> Result<Self, ConfigError> {
        let config = Self::from_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-references and bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.simulation.iterations == 0 {
            return Err(invalid("simulation.iterations must be > 0".to_string()));
        }

        let subsystems = self.validate_subsystems()?;
        self.validate_routines(&subsystems)
    }

    fn validate_subsystems(&self) -> Result<HashSet<&str>, ConfigError> {
        if self.subsystems.is_empty() {
            return Err(invalid("at least one subsystem is required".to_string()));
        }
        if self.subsystems.len() > MAX_SUBSYSTEMS {
            return Err(invalid(format!(
                "{} subsystems declared, maximum is {MAX_SUBSYSTEMS}",
                self.subsystems.len()
            )));
        }

        let mut names = HashSet::new();
        for subsystem in &self.subsystems {
            if subsystem.name.trim().is_empty() {
                return Err(invalid("subsystem name cannot be empty".to_string()));
            }
            if !names.insert(subsystem.name.as_str()) {
                return Err(invalid(format!(
                    "duplicate subsystem '{}'",
                    subsystem.name
                )));
            }
        }
        Ok(names)
    }

    fn validate_routines(&self, subsystems: &HashSet<&str>) -> Result<(), ConfigError> {
        if self.routines.is_empty() {
            return Err(invalid("at least one routine is required".to_string()));
        }
        if self.routines.len() > MAX_ROUTINES {
            return Err(invalid(format!(
                "{} routines declared, maximum is {MAX_ROUTINES}",
                self.routines.len()
            )));
        }

        let mut names = HashSet::new();
        let mut owners = HashSet::new();
        for routine in &self.routines {
            if !names.insert(routine.name.as_str()) {
                return Err(invalid(format!("duplicate routine '{}'", routine.name)));
            }
            if let Some(owner) = &routine.owner {
                if !owners.insert(owner.as_str()) {
                    return Err(invalid(format!(
                        "routine '{}': owner token '{owner}' already used by another routine",
                        routine.name
                    )));
                }
            }
            if routine.hold_cycles == 0 {
                return Err(invalid(format!(
                    "routine '{}': hold_cycles must be > 0",
                    routine.name
                )));
            }
            if routine.subsystems.is_empty() {
                return Err(invalid(format!(
                    "routine '{}' requests no subsystems",
                    routine.name
                )));
            }

            let mut requested = HashSet::new();
            for name in &routine.subsystems {
                if !subsystems.contains(name.as_str()) {
                    return Err(invalid(format!(
                        "routine '{}' references unknown subsystem '{name}'",
                        routine.name
                    )));
                }
                if !requested.insert(name.as_str()) {
                    return Err(invalid(format!(
                        "routine '{}' lists subsystem '{name}' twice",
                        routine.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}
