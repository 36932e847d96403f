//! 48K home computer without video, sound or tape: a 16K ROM, 48K of RAM and
//! the ULA's memory and I/O contention.
//!
//! The ULA fetches screen data during the first 128 T-states of each of the
//! 192 display lines. A CPU access to 0x4000-0x7FFF in that window is held
//! off until the ULA's next free slot, which repeats every 8 T-states.

use z80emu_core::core::machine::Machine;
use z80emu_core::core::{MemoryAccess, PortAccess, Z80System};
use z80emu_core::cpu::{CpuStateTrait, Z80State};

use crate::image::{Image, ImageError, SnaSnapshot};
use crate::registry::{MachineConfig, MachineEntry};

pub const ROM_SIZE: usize = 0x4000;
pub const FRAME_TSTATES: u32 = 69888;
pub const TSTATES_PER_LINE: u32 = 224;
/// T-state of the first contended cycle in a frame.
pub const CONTENTION_START: u32 = 14335;
const DISPLAY_LINES: u32 = 192;
const CONTENDED_TSTATES_PER_LINE: u32 = 128;
const CONTENTION_PATTERN: [u32; 8] = [6, 5, 4, 3, 2, 1, 0, 0];

/// Contention delay for an access starting at frame T-state `tstates`.
pub fn contention_delay(tstates: u32) -> u32 {
    if tstates < CONTENTION_START {
        return 0;
    }
    let offset = tstates - CONTENTION_START;
    if offset >= DISPLAY_LINES * TSTATES_PER_LINE {
        return 0;
    }
    let line_tstate = offset % TSTATES_PER_LINE;
    if line_tstate >= CONTENDED_TSTATES_PER_LINE {
        return 0;
    }
    CONTENTION_PATTERN[(line_tstate % 8) as usize]
}

fn is_contended(address: u16) -> bool {
    (0x4000..0x8000).contains(&address)
}

// ---------------------------------------------------------------------------
// UlaMemory
// ---------------------------------------------------------------------------

pub struct UlaMemory {
    memory: [u8; 0x10000],
}

impl UlaMemory {
    pub fn new(rom: &[u8]) -> Result<Self, ImageError> {
        if rom.len() != ROM_SIZE {
            return Err(ImageError::WrongSize {
                expected: ROM_SIZE,
                actual: rom.len(),
            });
        }
        let mut memory = [0; 0x10000];
        memory[..ROM_SIZE].copy_from_slice(rom);
        Ok(Self { memory })
    }
}

impl MemoryAccess for UlaMemory {
    fn read_byte_internal(&mut self, _tstates: u32, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write_byte_internal(&mut self, _tstates: u32, address: u16, value: u8) {
        if address as usize >= ROM_SIZE {
            self.memory[address as usize] = value;
        }
    }

    fn contend_read(&mut self, tstates: &mut u32, address: u16, time: u32) {
        if is_contended(address) {
            *tstates += contention_delay(*tstates);
        }
        *tstates += time;
    }

    fn read(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8, protect_rom: bool) {
        if !protect_rom || address as usize >= ROM_SIZE {
            self.memory[address as usize] = value;
        }
    }

    fn data(&self) -> &[u8; 0x10000] {
        &self.memory
    }
}

// ---------------------------------------------------------------------------
// UlaPorts
// ---------------------------------------------------------------------------

/// ULA port decoding: any even port is the ULA. There is no keyboard, so
/// every read sees no keys pressed.
#[derive(Default)]
pub struct UlaPorts {
    border: u8,
}

impl UlaPorts {
    pub fn border(&self) -> u8 {
        self.border
    }

    pub fn set_border(&mut self, border: u8) {
        self.border = border & 0x07;
    }

    /// First T-state of the I/O cycle: contended only through the high byte.
    fn pre_io(tstates: &mut u32, port: u16) {
        if is_contended(port) {
            *tstates += contention_delay(*tstates);
        }
        *tstates += 1;
    }

    /// Remaining three T-states, in one of the four ULA I/O patterns.
    fn post_io(tstates: &mut u32, port: u16) {
        if port & 0x0001 == 0 {
            *tstates += contention_delay(*tstates);
            *tstates += 3;
        } else if is_contended(port) {
            for _ in 0..3 {
                *tstates += contention_delay(*tstates);
                *tstates += 1;
            }
        } else {
            *tstates += 3;
        }
    }
}

impl PortAccess for UlaPorts {
    fn read_port(&mut self, tstates: &mut u32, port: u16) -> u8 {
        Self::pre_io(tstates, port);
        Self::post_io(tstates, port);
        0xFF
    }

    fn write_port(&mut self, tstates: &mut u32, port: u16, value: u8) {
        Self::pre_io(tstates, port);
        if port & 0x0001 == 0 {
            self.set_border(value);
        }
        Self::post_io(tstates, port);
    }
}

// ---------------------------------------------------------------------------
// Spectrum48
// ---------------------------------------------------------------------------

pub struct Spectrum48 {
    system: Z80System<UlaMemory, UlaPorts>,
    frame_tstates: u32,
}

impl Spectrum48 {
    pub fn new(rom: &Image) -> Result<Self, ImageError> {
        let memory = UlaMemory::new(rom.require_size(ROM_SIZE)?)?;
        Ok(Self {
            system: Z80System::new(memory, UlaPorts::default()),
            frame_tstates: FRAME_TSTATES,
        })
    }

    pub fn border(&self) -> u8 {
        self.system.ports().border()
    }

    pub fn load_snapshot(&mut self, snapshot: &SnaSnapshot) {
        snapshot.apply(self);
        self.system.ports_mut().set_border(snapshot.border);
    }

    pub fn system(&self) -> &Z80System<UlaMemory, UlaPorts> {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut Z80System<UlaMemory, UlaPorts> {
        &mut self.system
    }
}

impl Machine for Spectrum48 {
    fn name(&self) -> &'static str {
        "spectrum48"
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
    let rom = config
        .rom
        .as_ref()
        .ok_or_else(|| ImageError::Missing("16K ROM image".to_string()))?;
    let mut machine = Spectrum48::new(rom)?;
    machine.frame_tstates = config.frame_tstates_or(FRAME_TSTATES)?;
    config.apply(&mut machine)?;
    if let Some(snapshot) = &config.snapshot {
        machine.system.ports_mut().set_border(snapshot.border);
    }
    Ok(Box::new(machine))
}

inventory::submit! {
    MachineEntry::new("spectrum48", "16K ROM + 48K RAM with ULA contention", create_machine)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
