use crate::core::Bus;

/// Generic CPU interface
pub trait Cpu: CpuStateTrait {
    /// Power-on state
    fn reset(&mut self);

    /// Execute until the T-state counter reaches the budget, or burn the
    /// remaining budget in the halted refetch loop.
    fn run_to_budget(&mut self, bus: &mut dyn Bus);

    /// Attempt a maskable interrupt. Returns true if it was accepted.
    fn interrupt(&mut self, bus: &mut dyn Bus) -> bool;

    /// Query if CPU is halted internally (HALT instruction)
    fn is_halted(&self) -> bool;
}

// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, Z80State};

// Z80 CPU
pub mod z80;
pub use z80::Z80;
