pub mod core;
pub mod cpu;

pub mod prelude {
    pub use crate::core::machine::Machine;
    pub use crate::core::{Bus, MemoryAccess, PortAccess, SplitBus, Z80System};
    pub use crate::cpu::{Cpu, CpuStateTrait, Z80, Z80State};
}
