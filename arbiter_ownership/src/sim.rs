//! Control-loop simulator.
//!
//! Spawns one thread per configured routine. Every routine runs a periodic
//! loop against a shared [`OwnershipRegistry`]:
//!
//! - **Named routines** try to acquire all their subsystems at once
//!   (scoped guards, all-or-nothing), validate ownership on every held
//!   cycle, and release after `hold_cycles`.
//! - **Anonymous routines** never claim ownership. They act only on cycles
//!   where every subsystem they need is free.
//!
//! Each simulated device carries an occupancy flag set while a named routine
//! holds it. A second routine finding the flag already set means mutual
//! exclusion was broken and the run fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use arbiter_common::config::ConfigError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{RoutineConfig, SimConfig};
use crate::error::OwnershipError;
use crate::guard::OwnershipGuard;
use crate::registry::OwnershipRegistry;
use crate::subsystem::{ExclusiveSubsystem, Subsystem, SubsystemId};
use crate::token::OwnerToken;

// ─── Errors ─────────────────────────────────────────────────────────

/// Simulator failures.
#[derive(Error, Debug)]
pub enum SimError {
    /// Scenario file could not be loaded or failed validation.
    #[error("scenario configuration: {0}")]
    Config(#[from] ConfigError),

    /// A routine failed an ownership check it relied on.
    #[error("routine '{routine}': {source}")]
    Ownership {
        routine: String,
        #[source]
        source: OwnershipError,
    },

    /// Two routines held the same device at once.
    #[error("routine '{routine}' found device {device} already in use")]
    ExclusionBroken { routine: String, device: String },

    /// A routine thread panicked.
    #[error("routine '{routine}' panicked")]
    RoutinePanicked { routine: String },
}

// ─── Devices ────────────────────────────────────────────────────────

/// Simulated device: a subsystem identity plus an occupancy flag.
#[derive(Debug)]
pub struct SimDevice {
    subsystem: Subsystem,
    busy: AtomicBool,
}

impl SimDevice {
    fn new(name: &str) -> Self {
        Self {
            subsystem: Subsystem::new(name),
            busy: AtomicBool::new(false),
        }
    }

    /// Mark the device in use. Returns `false` if it already was.
    fn occupy(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn vacate(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// `true` while a named routine is commanding the device.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl ExclusiveSubsystem for SimDevice {
    fn subsystem_id(&self) -> SubsystemId {
        self.subsystem.id()
    }

    fn subsystem_name(&self) -> &str {
        self.subsystem.name()
    }
}

// ─── Reports ────────────────────────────────────────────────────────

/// Per-routine outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineReport {
    pub name: String,
    pub owner: Option<String>,
    /// Loop iterations executed.
    pub cycles: u32,
    /// Successful all-or-nothing acquisitions.
    pub acquisitions: u32,
    /// Cycles where a needed subsystem belonged to someone else.
    pub contended: u32,
    /// Cycles spent commanding the subsystems.
    pub active_cycles: u32,
}

/// Outcome of a full simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimReport {
    pub routines: Vec<RoutineReport>,
    /// Registry contents after every routine finished, by subsystem name.
    pub final_owners: Vec<(String, OwnerToken)>,
}

impl SimReport {
    /// Report for the routine called `name`.
    pub fn routine(&self, name: &str) -> Option<&RoutineReport> {
        self.routines.iter().find(|r| r.name == name)
    }
}

// ─── Simulator ──────────────────────────────────────────────────────

/// Multi-threaded driver for an [`OwnershipRegistry`].
#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    registry: Arc<OwnershipRegistry>,
    devices: HashMap<String, SimDevice>,
}

impl Simulator {
    /// Build a simulator with a fresh registry.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_registry(config, Arc::new(OwnershipRegistry::new()))
    }

    /// Build a simulator around an existing registry.
    pub fn with_registry(
        config: SimConfig,
        registry: Arc<OwnershipRegistry>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let devices = config
            .subsystems
            .iter()
            .map(|s| (s.name.clone(), SimDevice::new(&s.name)))
            .collect();
        Ok(Self {
            config,
            registry,
            devices,
        })
    }

    /// Registry shared by all routines.
    pub fn registry(&self) -> &Arc<OwnershipRegistry> {
        &self.registry
    }

    /// Device declared under `name`.
    pub fn device(&self, name: &str) -> Option<&SimDevice> {
        self.devices.get(name)
    }

    /// Run every routine to completion.
    ///
    /// # Errors
    ///
    /// Returns the first routine failure in declaration order.
    pub fn run(&self) -> Result<SimReport, SimError> {
        info!(
            routines = self.config.routines.len(),
            subsystems = self.devices.len(),
            iterations = self.config.simulation.iterations,
            "simulation starting"
        );

        let results: Vec<Result<RoutineReport, SimError>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .config
                .routines
                .iter()
                .map(|routine| (routine, scope.spawn(move || self.run_routine(routine))))
                .collect();

            handles
                .into_iter()
                .map(|(routine, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(SimError::RoutinePanicked {
                            routine: routine.name.clone(),
                        })
                    })
                })
                .collect()
        });

        let routines = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let names: HashMap<SubsystemId, &str> = self
            .devices
            .values()
            .map(|d| (d.subsystem_id(), d.subsystem_name()))
            .collect();
        let final_owners = self
            .registry
            .snapshot()
            .into_iter()
            .filter_map(|(id, owner)| names.get(&id).map(|name| (name.to_string(), owner)))
            .collect();

        info!("simulation complete");
        Ok(SimReport {
            routines,
            final_owners,
        })
    }

    fn devices_for(&self, routine: &RoutineConfig) -> Vec<&SimDevice> {
        // Names were cross-checked by `SimConfig::validate`.
        routine
            .subsystems
            .iter()
            .filter_map(|name| self.devices.get(name))
            .collect()
    }

    fn run_routine(&self, routine: &RoutineConfig) -> Result<RoutineReport, SimError> {
        let devices = self.devices_for(routine);
        let mut report = RoutineReport {
            name: routine.name.clone(),
            owner: routine.owner.clone(),
            ..Default::default()
        };

        match routine.owner.as_deref() {
            Some(owner) => self.run_owned(routine, owner, &devices, &mut report)?,
            None => self.run_anonymous(&devices, &mut report),
        }

        debug!(
            routine = %report.name,
            acquisitions = report.acquisitions,
            contended = report.contended,
            active = report.active_cycles,
            "routine finished"
        );
        Ok(report)
    }

    fn run_owned(
        &self,
        routine: &RoutineConfig,
        owner: &str,
        devices: &[&SimDevice],
        report: &mut RoutineReport,
    ) -> Result<(), SimError> {
        let registry = self.registry.as_ref();
        let mut held: Option<Holding<'_, '_>> = None;

        for _ in 0..self.config.simulation.iterations {
            report.cycles += 1;

            match held.as_mut() {
                None => match acquire_all(registry, owner, devices) {
                    Some(guards) => {
                        let holding = held.insert(Holding {
                            guards,
                            devices,
                            occupied: 0,
                            remaining: routine.hold_cycles - 1,
                        });
                        for device in devices {
                            if !device.occupy() {
                                return Err(SimError::ExclusionBroken {
                                    routine: routine.name.clone(),
                                    device: device.subsystem_name().to_string(),
                                });
                            }
                            holding.occupied += 1;
                        }
                        report.acquisitions += 1;
                        report.active_cycles += 1;
                    }
                    None => report.contended += 1,
                },
                Some(holding) => {
                    for device in devices {
                        registry
                            .validate_ownership(Some(owner), *device)
                            .map_err(|source| SimError::Ownership {
                                routine: routine.name.clone(),
                                source,
                            })?;
                    }
                    report.active_cycles += 1;
                    holding.remaining = holding.remaining.saturating_sub(1);
                }
            }

            if held.as_ref().is_some_and(|h| h.remaining == 0) {
                held = None;
            }

            thread::sleep(self.config.simulation.cycle_time());
        }

        Ok(())
    }

    fn run_anonymous(&self, devices: &[&SimDevice], report: &mut RoutineReport) {
        let registry = self.registry.as_ref();
        for _ in 0..self.config.simulation.iterations {
            report.cycles += 1;
            let free = devices.iter().all(|d| {
                // A null caller is never reported as a violation.
                matches!(registry.validate_ownership(None, *d), Ok(true))
            });
            if free {
                report.active_cycles += 1;
            } else {
                report.contended += 1;
            }
            thread::sleep(self.config.simulation.cycle_time());
        }
    }
}

/// Subsystems currently held by a named routine.
///
/// Dropping it, on any exit path, vacates the devices this routine occupied
/// and then releases the guards.
struct Holding<'r, 'd> {
    guards: Vec<OwnershipGuard<'r>>,
    devices: &'d [&'d SimDevice],
    /// Leading devices whose occupancy flag this routine set.
    occupied: usize,
    remaining: u32,
}

impl Drop for Holding<'_, '_> {
    fn drop(&mut self) {
        // Vacate before the registry entries go away so the next holder
        // never sees a stale flag. Fields, guards included, drop after this.
        for device in &self.devices[..self.occupied] {
            device.vacate();
        }
    }
}

/// All-or-nothing acquisition. Guards taken before a failure are dropped,
/// which releases them.
fn acquire_all<'r>(
    registry: &'r OwnershipRegistry,
    owner: &str,
    devices: &[&SimDevice],
) -> Option<Vec<OwnershipGuard<'r>>> {
    let mut guards = Vec::with_capacity(devices.len());
    for device in devices {
        match registry.try_acquire(Some(owner), *device) {
            Ok(guard) => guards.push(guard),
            Err(err) => {
                warn!(owner, device = device.subsystem_name(), %err, "acquire contended, backing off");
                return None;
            }
        }
    }
    Some(guards)
}
