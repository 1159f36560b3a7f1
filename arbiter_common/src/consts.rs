//! System-wide constants for the arbiter workspace.
//!
//! Single source of truth for numeric limits and default paths.

/// Maximum number of subsystems a simulation scenario may declare.
pub const MAX_SUBSYSTEMS: usize = 64;

/// Maximum number of control routines a simulation scenario may declare.
pub const MAX_ROUTINES: usize = 32;

/// Default control-loop period in milliseconds (50 Hz).
pub const DEFAULT_CYCLE_TIME_MS: u64 = 20;

/// Default number of cycles a routine keeps its subsystems once acquired.
pub const DEFAULT_HOLD_CYCLES: u32 = 5;

/// Default scenario file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/sim.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MAX_SUBSYSTEMS > 0);
        assert!(MAX_ROUTINES > 0);
        assert!(DEFAULT_CYCLE_TIME_MS > 0);
        assert!(DEFAULT_HOLD_CYCLES > 0);
    }
}
