pub mod bus;
pub mod machine;
pub mod system;

pub use bus::{Bus, MemoryAccess, PortAccess, SplitBus};
pub use machine::Machine;
pub use system::Z80System;
