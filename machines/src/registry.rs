//! Machine registry for automatic front-end discovery.
//!
//! Each host machine self-registers via [`inventory::submit!`] with a
//! [`MachineEntry`] holding its CLI name, a one-line description and a
//! factory. The front-end finds machines at runtime without a central list.

use z80emu_core::core::machine::Machine;

use crate::image::{Image, ImageError, SnaSnapshot};

/// Everything the front-end can hand a machine factory.
#[derive(Clone, Debug, Default)]
pub struct MachineConfig {
    /// ROM mapped at address 0. Required by some machines.
    pub rom: Option<Image>,
    /// Raw program copied to `load_address` after construction.
    pub program: Option<Image>,
    pub load_address: u16,
    /// Initial PC. Applied last, so it overrides a snapshot's PC.
    pub entry: Option<u16>,
    pub snapshot: Option<SnaSnapshot>,
    /// Override the machine's frame length.
    pub frame_tstates: Option<u32>,
}

impl MachineConfig {
    /// The frame length override, or `default` when none was given.
    pub fn frame_tstates_or(&self, default: u32) -> Result<u32, ImageError> {
        match self.frame_tstates {
            Some(0) => Err(ImageError::ZeroFrameLength),
            Some(frame_tstates) => Ok(frame_tstates),
            None => Ok(default),
        }
    }

    /// Load the program and snapshot into a freshly built machine and set
    /// the entry point.
    pub fn apply(&self, machine: &mut dyn Machine) -> Result<(), ImageError> {
        if let Some(program) = &self.program {
            program.check_fits(self.load_address)?;
            machine.load_image(self.load_address, &program.data);
        }
        if let Some(snapshot) = &self.snapshot {
            snapshot.apply(machine);
        }
        if let Some(entry) = self.entry {
            let mut state = machine.cpu_state();
            state.pc = entry;
            machine.restore_cpu_state(&state);
        }
        Ok(())
    }
}

/// Describes a front-end-capable host machine.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "flat").
    pub name: &'static str,
    pub description: &'static str,
    /// Factory: construct a Machine from the front-end's configuration.
    pub create: fn(&MachineConfig) -> Result<Box<dyn Machine>, ImageError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn(&MachineConfig) -> Result<Box<dyn Machine>, ImageError>,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
