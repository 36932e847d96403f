use std::fmt;

use serde::{Deserialize, Serialize};
use z80emu_core::core::{MemoryAccess, PortAccess};
use z80emu_core::cpu::Z80State;

pub mod fuse;

// --- TracingBus: flat 64KB memory with T-state stamped event recording ---

/// Bus event kinds, named as in the FUSE test suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Memory contention point (an address on the bus for `time` T-states)
    MC,
    MR,
    MW,
    /// Port contention point
    PC,
    PR,
    PW,
}

impl EventKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MC" => Some(Self::MC),
            "MR" => Some(Self::MR),
            "MW" => Some(Self::MW),
            "PC" => Some(Self::PC),
            "PR" => Some(Self::PR),
            "PW" => Some(Self::PW),
            _ => None,
        }
    }

    pub fn is_memory(self) -> bool {
        matches!(self, Self::MC | Self::MR | Self::MW)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub tstates: u32,
    pub kind: EventKind,
    pub address: u16,
    /// Transferred byte; `None` for contention events.
    pub data: Option<u8>,
}

/// Formats the event the way `tests.expected` lists it.
impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:5} {:?} {:04x}", self.tstates, self.kind, self.address)?;
        if let Some(data) = self.data {
            write!(f, " {data:02x}")?;
        }
        Ok(())
    }
}

/// 64K RAM and an echoing port model with FUSE test-suite timing: memory
/// cycles cost exactly their `time`, ports cost 4 T-states with contention
/// points logged for ports whose high byte is 0x40-0x7F, and port reads
/// return the high byte of the port address.
pub struct TracingBus {
    pub memory: [u8; 0x10000],
    pub events: Vec<TraceEvent>,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            events: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            self.memory[addr.wrapping_add(offset as u16) as usize] = byte;
        }
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn push(&mut self, tstates: u32, kind: EventKind, address: u16, data: Option<u8>) {
        self.events.push(TraceEvent {
            tstates,
            kind,
            address,
            data,
        });
    }

    fn port_contended(port: u16) -> bool {
        port & 0xC000 == 0x4000
    }

    fn pre_io(&mut self, tstates: &mut u32, port: u16) {
        if Self::port_contended(port) {
            self.push(*tstates, EventKind::PC, port, None);
        }
        *tstates += 1;
    }

    fn post_io(&mut self, tstates: &mut u32, port: u16) {
        if port & 0x0001 == 0 {
            self.push(*tstates, EventKind::PC, port, None);
            *tstates += 3;
        } else if Self::port_contended(port) {
            for _ in 0..3 {
                self.push(*tstates, EventKind::PC, port, None);
                *tstates += 1;
            }
        } else {
            *tstates += 3;
        }
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccess for TracingBus {
    fn read_byte_internal(&mut self, tstates: u32, address: u16) -> u8 {
        let data = self.memory[address as usize];
        self.push(tstates, EventKind::MR, address, Some(data));
        data
    }

    fn write_byte_internal(&mut self, tstates: u32, address: u16, value: u8) {
        self.push(tstates, EventKind::MW, address, Some(value));
        self.memory[address as usize] = value;
    }

    fn contend_read(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.push(*tstates, EventKind::MC, address, None);
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

impl PortAccess for TracingBus {
    fn read_port(&mut self, tstates: &mut u32, port: u16) -> u8 {
        self.pre_io(tstates, port);
        let value = (port >> 8) as u8;
        self.push(*tstates, EventKind::PR, port, Some(value));
        self.post_io(tstates, port);
        value
    }

    fn write_port(&mut self, tstates: &mut u32, port: u16, value: u8) {
        self.pre_io(tstates, port);
        self.push(*tstates, EventKind::PW, port, Some(value));
        self.post_io(tstates, port);
    }
}

// --- JSON test vector types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub initial: CpuState,
    #[serde(rename = "final")]
    pub final_state: CpuState,
    pub events: Vec<TraceEvent>,
}

/// Register file plus the RAM bytes an instruction touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub af_prime: u16,
    pub bc_prime: u16,
    pub de_prime: u16,
    pub hl_prime: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub halted: bool,
    pub tstates: u32,
    pub ram: Vec<(u16, u8)>,
}

fn pair(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

impl CpuState {
    pub fn from_z80(s: &Z80State, ram: Vec<(u16, u8)>) -> Self {
        Self {
            af: pair(s.a, s.f),
            bc: pair(s.b, s.c),
            de: pair(s.d, s.e),
            hl: pair(s.h, s.l),
            af_prime: pair(s.a_prime, s.f_prime),
            bc_prime: pair(s.b_prime, s.c_prime),
            de_prime: pair(s.d_prime, s.e_prime),
            hl_prime: pair(s.h_prime, s.l_prime),
            ix: s.ix,
            iy: s.iy,
            sp: s.sp,
            pc: s.pc,
            i: s.i,
            r: s.r,
            iff1: s.iff1,
            iff2: s.iff2,
            im: s.im,
            halted: s.halted,
            tstates: s.tstates,
            ram,
        }
    }

    pub fn to_z80(&self) -> Z80State {
        let hi = |v: u16| (v >> 8) as u8;
        let lo = |v: u16| v as u8;
        Z80State {
            a: hi(self.af),
            f: lo(self.af),
            b: hi(self.bc),
            c: lo(self.bc),
            d: hi(self.de),
            e: lo(self.de),
            h: hi(self.hl),
            l: lo(self.hl),
            a_prime: hi(self.af_prime),
            f_prime: lo(self.af_prime),
            b_prime: hi(self.bc_prime),
            c_prime: lo(self.bc_prime),
            d_prime: hi(self.de_prime),
            e_prime: lo(self.de_prime),
            h_prime: hi(self.hl_prime),
            l_prime: lo(self.hl_prime),
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
            tstates: self.tstates,
        }
    }
}

/// First field that differs between two register files, as
/// `"NAME (got 0x.. exp 0x..)"`.
pub fn diff_registers(got: &Z80State, exp: &Z80State) -> Option<String> {
    let fields: [(&str, u32, u32); 27] = [
        ("A", got.a.into(), exp.a.into()),
        ("F", got.f.into(), exp.f.into()),
        ("B", got.b.into(), exp.b.into()),
        ("C", got.c.into(), exp.c.into()),
        ("D", got.d.into(), exp.d.into()),
        ("E", got.e.into(), exp.e.into()),
        ("H", got.h.into(), exp.h.into()),
        ("L", got.l.into(), exp.l.into()),
        ("A'", got.a_prime.into(), exp.a_prime.into()),
        ("F'", got.f_prime.into(), exp.f_prime.into()),
        ("B'", got.b_prime.into(), exp.b_prime.into()),
        ("C'", got.c_prime.into(), exp.c_prime.into()),
        ("D'", got.d_prime.into(), exp.d_prime.into()),
        ("E'", got.e_prime.into(), exp.e_prime.into()),
        ("H'", got.h_prime.into(), exp.h_prime.into()),
        ("L'", got.l_prime.into(), exp.l_prime.into()),
        ("IX", got.ix.into(), exp.ix.into()),
        ("IY", got.iy.into(), exp.iy.into()),
        ("SP", got.sp.into(), exp.sp.into()),
        ("PC", got.pc.into(), exp.pc.into()),
        ("I", got.i.into(), exp.i.into()),
        ("R", got.r.into(), exp.r.into()),
        ("IFF1", got.iff1.into(), exp.iff1.into()),
        ("IFF2", got.iff2.into(), exp.iff2.into()),
        ("IM", got.im.into(), exp.im.into()),
        ("HALT", got.halted.into(), exp.halted.into()),
        ("T", got.tstates, exp.tstates),
    ];
    fields
        .iter()
        .find(|(_, g, e)| g != e)
        .map(|(name, g, e)| format!("{name} (got 0x{g:X} exp 0x{e:X})"))
}
