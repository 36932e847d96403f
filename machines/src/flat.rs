//! Flat 64K machine: uncontended RAM with an optional write-protected ROM
//! at the bottom of the address space, and a recording port backend.

use z80emu_core::core::machine::Machine;
use z80emu_core::core::{MemoryAccess, PortAccess, Z80System};
use z80emu_core::cpu::{CpuStateTrait, Z80State};

use crate::image::ImageError;
use crate::registry::{MachineConfig, MachineEntry};

/// Default frame length: the 48K home-computer frame, so programs that rely
/// on a 50 Hz interrupt see the usual cadence.
pub const DEFAULT_FRAME_TSTATES: u32 = 69888;

// ---------------------------------------------------------------------------
// FlatMemory
// ---------------------------------------------------------------------------

pub struct FlatMemory {
    ram: [u8; 0x10000],
    /// Addresses below this are ROM. 0 means no ROM.
    rom_end: usize,
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            ram: [0; 0x10000],
            rom_end: 0,
        }
    }

    /// Copy `rom` to address 0 and write-protect it.
    pub fn with_rom(rom: &[u8]) -> Result<Self, ImageError> {
        if rom.len() > 0x10000 {
            return Err(ImageError::TooLarge {
                size: rom.len(),
                load_address: 0,
            });
        }
        let mut memory = Self::new();
        memory.ram[..rom.len()].copy_from_slice(rom);
        memory.rom_end = rom.len();
        Ok(memory)
    }

    pub fn rom_end(&self) -> usize {
        self.rom_end
    }

    fn is_rom(&self, address: u16) -> bool {
        (address as usize) < self.rom_end
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccess for FlatMemory {
    fn read_byte_internal(&mut self, _tstates: u32, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write_byte_internal(&mut self, _tstates: u32, address: u16, value: u8) {
        if !self.is_rom(address) {
            self.ram[address as usize] = value;
        }
    }

    fn contend_read(&mut self, tstates: &mut u32, _address: u16, time: u32) {
        *tstates += time;
    }

    fn read(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8, protect_rom: bool) {
        if !(protect_rom && self.is_rom(address)) {
            self.ram[address as usize] = value;
        }
    }

    fn data(&self) -> &[u8; 0x10000] {
        &self.ram
    }
}

// ---------------------------------------------------------------------------
// FlatPorts
// ---------------------------------------------------------------------------

/// Port backend that latches inputs per low port byte and records writes.
pub struct FlatPorts {
    inputs: [u8; 256],
    writes: Vec<(u16, u8)>,
}

impl FlatPorts {
    pub fn new() -> Self {
        Self {
            inputs: [0xFF; 256],
            writes: Vec::new(),
        }
    }

    /// Value returned by reads of any port whose low byte is `port`.
    pub fn set_input(&mut self, port: u8, value: u8) {
        self.inputs[port as usize] = value;
    }

    /// Every port write so far, oldest first.
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    pub fn take_writes(&mut self) -> Vec<(u16, u8)> {
        std::mem::take(&mut self.writes)
    }
}

impl Default for FlatPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl PortAccess for FlatPorts {
    fn read_port(&mut self, tstates: &mut u32, port: u16) -> u8 {
        *tstates += 1;
        let value = self.inputs[(port & 0xFF) as usize];
        *tstates += 3;
        value
    }

    fn write_port(&mut self, tstates: &mut u32, port: u16, value: u8) {
        *tstates += 1;
        self.writes.push((port, value));
        *tstates += 3;
    }
}

// ---------------------------------------------------------------------------
// FlatMachine
// ---------------------------------------------------------------------------

pub struct FlatMachine {
    system: Z80System<FlatMemory, FlatPorts>,
    frame_tstates: u32,
}

impl FlatMachine {
    pub fn new(memory: FlatMemory, frame_tstates: u32) -> Self {
        Self {
            system: Z80System::new(memory, FlatPorts::new()),
            frame_tstates,
        }
    }

    pub fn system(&self) -> &Z80System<FlatMemory, FlatPorts> {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut Z80System<FlatMemory, FlatPorts> {
        &mut self.system
    }
}

impl Machine for FlatMachine {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn frame_tstates(&self) -> u32 {
        self.frame_tstates
    }

    fn run_frame(&mut self) {
        self.system.run_frame(self.frame_tstates);
    }

    fn reset(&mut self) {
        self.system.reset();
    }

    fn load_image(&mut self, address: u16, data: &[u8]) {
        let memory = self.system.memory_mut();
        for (offset, &byte) in data.iter().enumerate() {
            memory.write(address.wrapping_add(offset as u16), byte, false);
        }
    }

    fn cpu_state(&self) -> Z80State {
        self.system.cpu().snapshot()
    }

    fn restore_cpu_state(&mut self, state: &Z80State) {
        self.system.restore(state);
    }

    fn memory(&self) -> &[u8] {
        self.system.memory().data()
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine(config: &MachineConfig) -> Result<Box<dyn Machine>, ImageError> {
    let memory = match &config.rom {
        Some(rom) => FlatMemory::with_rom(&rom.data)?,
        None => FlatMemory::new(),
    };
    let mut machine = FlatMachine::new(memory, config.frame_tstates_or(DEFAULT_FRAME_TSTATES)?);
    config.apply(&mut machine)?;
    Ok(Box::new(machine))
}

inventory::submit! {
    MachineEntry::new("flat", "64K RAM, no contention, recording ports", create_machine)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
