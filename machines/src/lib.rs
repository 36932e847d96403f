pub mod flat;
pub mod image;
pub mod registry;
pub mod spectrum48;

pub use flat::{FlatMachine, FlatMemory, FlatPorts};
pub use image::{Image, ImageError, SnaSnapshot};
pub use registry::{MachineConfig, MachineEntry};
pub use spectrum48::Spectrum48;
