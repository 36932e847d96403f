#![allow(dead_code)]

use z80emu_core::core::{MemoryAccess, PortAccess};
use z80emu_core::cpu::z80::Z80;

/// One bus interaction, in the order the CPU made it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Contend { addr: u16, time: u32 },
    NoMreq { addr: u16, time: u32 },
    Read { addr: u16, value: u8 },
    Write { addr: u16, value: u8 },
    PortRead { port: u16, value: u8 },
    PortWrite { port: u16, value: u8 },
}

/// Minimal bus for testing: flat 64KB memory with uncontended timing
/// (3 T per memory cycle, 4 T per port cycle), recording every access.
pub struct TestBus {
    pub memory: [u8; 0x10000],
    pub log: Vec<Access>,
    /// Value returned by port reads; `None` returns the port's high byte.
    pub port_input: Option<u8>,
    pub port_writes: Vec<(u16, u8)>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            log: Vec::new(),
            port_input: None,
            port_writes: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn no_mreq_cycles(&self) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, Access::NoMreq { .. }))
            .count()
    }

    pub fn memory_reads(&self) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, Access::Read { .. }))
            .count()
    }

    pub fn memory_writes(&self) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, Access::Write { .. }))
            .count()
    }
}

impl MemoryAccess for TestBus {
    fn read_byte_internal(&mut self, _tstates: u32, address: u16) -> u8 {
        let value = self.memory[address as usize];
        self.log.push(Access::Read { addr: address, value });
        value
    }

    fn write_byte_internal(&mut self, _tstates: u32, address: u16, value: u8) {
        self.memory[address as usize] = value;
        self.log.push(Access::Write { addr: address, value });
    }

    fn contend_read(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.log.push(Access::Contend { addr: address, time });
        *tstates += time;
    }

    fn contend_read_no_mreq(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.log.push(Access::NoMreq { addr: address, time });
        *tstates += time;
    }

    fn contend_write_no_mreq(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.log.push(Access::NoMreq { addr: address, time });
        *tstates += time;
    }

    fn read(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8, _protect_rom: bool) {
        self.memory[address as usize] = value;
    }

    fn data(&self) -> &[u8; 0x10000] {
        &self.memory
    }
}

impl PortAccess for TestBus {
    fn read_port(&mut self, tstates: &mut u32, port: u16) -> u8 {
        *tstates += 4;
        let value = self.port_input.unwrap_or((port >> 8) as u8);
        self.log.push(Access::PortRead { port, value });
        value
    }

    fn write_port(&mut self, tstates: &mut u32, port: u16, value: u8) {
        *tstates += 4;
        self.log.push(Access::PortWrite { port, value });
        self.port_writes.push((port, value));
    }
}

/// Execute one instruction and return the T-states it took.
pub fn run_instruction(cpu: &mut Z80, bus: &mut TestBus) -> u32 {
    let start = cpu.tstates;
    cpu.step(bus);
    cpu.tstates - start
}

/// CPU at PC 0 with `program` loaded at address 0.
pub fn setup(program: &[u8]) -> (Z80, TestBus) {
    let cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, program);
    (cpu, bus)
}
