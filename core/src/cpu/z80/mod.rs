mod alu;
mod bit;
mod block;
mod branch;
mod dispatch;
mod io;
mod load_store;
mod stack;
pub mod tables;

use crate::core::Bus;
use crate::cpu::{
    Cpu,
    state::{CpuStateTrait, Z80State},
};

pub use dispatch::TABLE_SIZE;

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// Named 16-bit views over the 8-bit register cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterPair {
    AF,
    BC,
    DE,
    HL,
    AFPrime,
    BCPrime,
    DEPrime,
    HLPrime,
    IX,
    IY,
}

pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ixh: u8,
    pub ixl: u8,
    pub iyh: u8,
    pub iyl: u8,
    pub i: u8,
    pub r: u8,  // 7-bit refresh counter
    pub r7: u8, // Bit 7 of R, only changed by LD R,A
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub halted: bool,
    pub tstates: u32,
    /// `run_to_budget` returns once `tstates` reaches this value.
    pub budget: u32,
    /// Scratch (IX+d)/(IY+d) address for DD CB / FD CB operations.
    pub effective_addr: u16,
    /// T-state at which the last EI executed, until the following instruction starts.
    pub interrupts_enabled_at: Option<u32>,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            a_prime: 0,
            f_prime: 0,
            b_prime: 0,
            c_prime: 0,
            d_prime: 0,
            e_prime: 0,
            h_prime: 0,
            l_prime: 0,
            ixh: 0,
            ixl: 0,
            iyh: 0,
            iyl: 0,
            i: 0,
            r: 0,
            r7: 0,
            sp: 0,
            pc: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            tstates: 0,
            budget: 0,
            effective_addr: 0,
            interrupts_enabled_at: None,
        }
    }

    // Helpers for 16-bit register access
    pub fn get_bc(&self) -> u16 { ((self.b as u16) << 8) | self.c as u16 }
    pub fn set_bc(&mut self, val: u16) { self.b = (val >> 8) as u8; self.c = val as u8; }

    pub fn get_de(&self) -> u16 { ((self.d as u16) << 8) | self.e as u16 }
    pub fn set_de(&mut self, val: u16) { self.d = (val >> 8) as u8; self.e = val as u8; }

    pub fn get_hl(&self) -> u16 { ((self.h as u16) << 8) | self.l as u16 }
    pub fn set_hl(&mut self, val: u16) { self.h = (val >> 8) as u8; self.l = val as u8; }

    pub fn get_af(&self) -> u16 { ((self.a as u16) << 8) | self.f as u16 }
    pub fn set_af(&mut self, val: u16) { self.a = (val >> 8) as u8; self.f = val as u8; }

    pub fn get_ix(&self) -> u16 { ((self.ixh as u16) << 8) | self.ixl as u16 }
    pub fn set_ix(&mut self, val: u16) { self.ixh = (val >> 8) as u8; self.ixl = val as u8; }

    pub fn get_iy(&self) -> u16 { ((self.iyh as u16) << 8) | self.iyl as u16 }
    pub fn set_iy(&mut self, val: u16) { self.iyh = (val >> 8) as u8; self.iyl = val as u8; }

    pub fn get16(&self, pair: RegisterPair) -> u16 {
        let (hi, lo) = match pair {
            RegisterPair::AF => (self.a, self.f),
            RegisterPair::BC => (self.b, self.c),
            RegisterPair::DE => (self.d, self.e),
            RegisterPair::HL => (self.h, self.l),
            RegisterPair::AFPrime => (self.a_prime, self.f_prime),
            RegisterPair::BCPrime => (self.b_prime, self.c_prime),
            RegisterPair::DEPrime => (self.d_prime, self.e_prime),
            RegisterPair::HLPrime => (self.h_prime, self.l_prime),
            RegisterPair::IX => (self.ixh, self.ixl),
            RegisterPair::IY => (self.iyh, self.iyl),
        };
        ((hi as u16) << 8) | lo as u16
    }

    pub fn set16(&mut self, pair: RegisterPair, val: u16) {
        let (hi, lo) = match pair {
            RegisterPair::AF => (&mut self.a, &mut self.f),
            RegisterPair::BC => (&mut self.b, &mut self.c),
            RegisterPair::DE => (&mut self.d, &mut self.e),
            RegisterPair::HL => (&mut self.h, &mut self.l),
            RegisterPair::AFPrime => (&mut self.a_prime, &mut self.f_prime),
            RegisterPair::BCPrime => (&mut self.b_prime, &mut self.c_prime),
            RegisterPair::DEPrime => (&mut self.d_prime, &mut self.e_prime),
            RegisterPair::HLPrime => (&mut self.h_prime, &mut self.l_prime),
            RegisterPair::IX => (&mut self.ixh, &mut self.ixl),
            RegisterPair::IY => (&mut self.iyh, &mut self.iyl),
        };
        *hi = (val >> 8) as u8;
        *lo = val as u8;
    }

    /// R as software sees it: the 7-bit counter with the stored bit 7.
    pub fn r_register(&self) -> u8 {
        (self.r & 0x7F) | (self.r7 & 0x80)
    }

    pub fn set_r_register(&mut self, val: u8) {
        self.r = val & 0x7F;
        self.r7 = val;
    }

    /// I and R as driven onto the address bus during the refresh cycle.
    pub fn ir(&self) -> u16 {
        ((self.i as u16) << 8) | self.r_register() as u16
    }

    /// Set the T-state count `run_to_budget` stops at.
    ///
    /// `tstates` is never wrapped by the CPU. A host driving the budget
    /// directly must rebase the counter between frames (as
    /// `Z80System::run_frame` does) or it overflows after 2^32 T-states.
    pub fn set_budget(&mut self, budget: u32) {
        self.budget = budget;
    }

    #[inline]
    pub(crate) fn increment_r(&mut self) {
        self.r = self.r.wrapping_add(1) & 0x7F;
    }

    pub(crate) fn flag(&self, flag: Flag) -> bool {
        (self.f & flag as u8) != 0
    }

    /// Evaluate condition code cc (0=NZ, 1=Z, 2=NC, 3=C, 4=PO, 5=PE, 6=P, 7=M).
    pub(crate) fn condition(&self, cc: u8) -> bool {
        match cc {
            0 => !self.flag(Flag::Z),
            1 => self.flag(Flag::Z),
            2 => !self.flag(Flag::C),
            3 => self.flag(Flag::C),
            4 => !self.flag(Flag::PV),
            5 => self.flag(Flag::PV),
            6 => !self.flag(Flag::S),
            7 => self.flag(Flag::S),
            _ => unreachable!("condition called with cc {}", cc),
        }
    }

    pub fn get_reg8(&self, index: u8) -> u8 {
        match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("get_reg8 called with index {}", index),
        }
    }

    pub fn set_reg8(&mut self, index: u8, val: u8) {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("set_reg8 called with index {}", index),
        }
    }

    /// Get 8-bit register by index with H/L replaced by the index register halves
    /// (undocumented IXH/IXL/IYH/IYL). Index 6 is not handled here.
    pub(crate) fn get_reg8_index<const IY: bool>(&self, index: u8) -> u8 {
        match (index, IY) {
            (4, false) => self.ixh,
            (5, false) => self.ixl,
            (4, true) => self.iyh,
            (5, true) => self.iyl,
            _ => self.get_reg8(index),
        }
    }

    pub(crate) fn set_reg8_index<const IY: bool>(&mut self, index: u8, val: u8) {
        match (index, IY) {
            (4, false) => self.ixh = val,
            (5, false) => self.ixl = val,
            (4, true) => self.iyh = val,
            (5, true) => self.iyl = val,
            _ => self.set_reg8(index, val),
        }
    }

    pub(crate) fn get_index<const IY: bool>(&self) -> u16 {
        if IY { self.get_iy() } else { self.get_ix() }
    }

    pub(crate) fn set_index<const IY: bool>(&mut self, val: u16) {
        if IY { self.set_iy(val) } else { self.set_ix(val) }
    }

    /// Get 16-bit register pair by index (0=BC, 1=DE, 2=HL, 3=SP).
    pub(crate) fn get_rp(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_hl(),
            3 => self.sp,
            _ => unreachable!("get_rp called with index {}", index),
        }
    }

    /// Set 16-bit register pair by index (0=BC, 1=DE, 2=HL, 3=SP).
    pub(crate) fn set_rp(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_hl(val),
            3 => self.sp = val,
            _ => unreachable!("set_rp called with index {}", index),
        }
    }

    /// Register pair by index with HL replaced by IX/IY.
    pub(crate) fn get_rp_index<const IY: bool>(&self, index: u8) -> u16 {
        if index == 2 { self.get_index::<IY>() } else { self.get_rp(index) }
    }

    // --- Bus helpers ---
    // Thin wrappers that lend the T-state counter to the backend.

    #[inline]
    pub(crate) fn read_byte(&mut self, bus: &mut dyn Bus, address: u16) -> u8 {
        bus.read_byte(&mut self.tstates, address)
    }

    #[inline]
    pub(crate) fn write_byte(&mut self, bus: &mut dyn Bus, address: u16, value: u8) {
        bus.write_byte(&mut self.tstates, address, value)
    }

    #[inline]
    pub(crate) fn contend_read(&mut self, bus: &mut dyn Bus, address: u16, time: u32) {
        bus.contend_read(&mut self.tstates, address, time)
    }

    #[inline]
    pub(crate) fn contend_read_no_mreq(&mut self, bus: &mut dyn Bus, address: u16, time: u32) {
        bus.contend_read_no_mreq(&mut self.tstates, address, time)
    }

    #[inline]
    pub(crate) fn contend_read_no_mreq_loop(&mut self, bus: &mut dyn Bus, address: u16, time: u32, count: u32) {
        bus.contend_read_no_mreq_loop(&mut self.tstates, address, time, count)
    }

    #[inline]
    pub(crate) fn contend_write_no_mreq_loop(&mut self, bus: &mut dyn Bus, address: u16, time: u32, count: u32) {
        bus.contend_write_no_mreq_loop(&mut self.tstates, address, time, count)
    }

    #[inline]
    pub(crate) fn read_port(&mut self, bus: &mut dyn Bus, port: u16) -> u8 {
        bus.read_port(&mut self.tstates, port)
    }

    #[inline]
    pub(crate) fn write_port(&mut self, bus: &mut dyn Bus, port: u16, value: u8) {
        bus.write_port(&mut self.tstates, port, value)
    }

    /// Read the byte at PC as an operand (3 T) and advance PC.
    pub(crate) fn fetch_operand(&mut self, bus: &mut dyn Bus) -> u8 {
        let val = self.read_byte(bus, self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    /// Read a little-endian word at PC (3 T + 3 T) and advance PC past it.
    pub(crate) fn fetch_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = self.fetch_operand(bus);
        let hi = self.fetch_operand(bus);
        ((hi as u16) << 8) | lo as u16
    }

    // --- Execution ---

    /// Run until `tstates` reaches `budget`. If the CPU halts (or starts
    /// halted) the remaining budget is spent re-fetching the HALT opcode.
    pub fn run_to_budget(&mut self, bus: &mut dyn Bus) {
        while self.tstates < self.budget && !self.halted {
            self.execute_next(bus);
        }

        if self.halted {
            while self.tstates < self.budget {
                self.halted_refetch(bus);
            }
        }
    }

    /// Execute exactly one instruction (or one halted refetch), ignoring the budget.
    pub fn step(&mut self, bus: &mut dyn Bus) {
        if self.halted {
            self.halted_refetch(bus);
        } else {
            self.execute_next(bus);
        }
    }

    fn halted_refetch(&mut self, bus: &mut dyn Bus) {
        self.contend_read(bus, self.pc, 4);
        self.increment_r();
    }

    fn execute_next(&mut self, bus: &mut dyn Bus) {
        self.contend_read(bus, self.pc, 4);
        let opcode = bus.read_byte_internal(self.tstates, self.pc);
        self.increment_r();
        self.pc = self.pc.wrapping_add(1);
        // The instruction after EI has started; interrupts are acceptable once it ends.
        self.interrupts_enabled_at = None;
        self.dispatch(bus, opcode as usize, opcode);
    }

    /// Attempt a maskable interrupt.
    ///
    /// Refused when IFF1 is clear, or when the instruction following an EI has
    /// not run yet. Otherwise: leave HALT, charge the 7 T-state acknowledge,
    /// bump R, clear both flip-flops, push PC and vector per IM.
    pub fn interrupt(&mut self, bus: &mut dyn Bus) -> bool {
        if !self.iff1 || self.interrupts_enabled_at.is_some() {
            return false;
        }

        if self.halted {
            self.pc = self.pc.wrapping_add(1);
            self.halted = false;
        }

        self.tstates += 7;
        self.increment_r();
        self.iff1 = false;
        self.iff2 = false;

        let [pcl, pch] = self.pc.to_le_bytes();
        self.sp = self.sp.wrapping_sub(1);
        self.write_byte(bus, self.sp, pch);
        self.sp = self.sp.wrapping_sub(1);
        self.write_byte(bus, self.sp, pcl);

        match self.im {
            0 | 1 => self.pc = 0x0038,
            2 => {
                let vector = ((self.i as u16) << 8) | 0xFF;
                let lo = self.read_byte(bus, vector);
                let hi = self.read_byte(bus, vector.wrapping_add(1));
                self.pc = u16::from_le_bytes([lo, hi]);
            }
            im => unreachable!("interrupt mode {} is not 0, 1 or 2", im),
        }
        true
    }

    /// Power-on state. The budget is kept so a host can reset mid-frame.
    pub fn reset(&mut self) {
        *self = Self {
            budget: self.budget,
            ..Self::new()
        };
    }
}

impl Cpu for Z80 {
    fn reset(&mut self) {
        Z80::reset(self)
    }

    fn run_to_budget(&mut self, bus: &mut dyn Bus) {
        Z80::run_to_budget(self, bus)
    }

    fn interrupt(&mut self, bus: &mut dyn Bus) -> bool {
        Z80::interrupt(self, bus)
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}

impl CpuStateTrait for Z80 {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.get_ix(),
            iy: self.get_iy(),
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r_register(),
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
            tstates: self.tstates,
        }
    }

    fn restore(&mut self, s: &Z80State) {
        self.a = s.a;
        self.f = s.f;
        self.b = s.b;
        self.c = s.c;
        self.d = s.d;
        self.e = s.e;
        self.h = s.h;
        self.l = s.l;
        self.a_prime = s.a_prime;
        self.f_prime = s.f_prime;
        self.b_prime = s.b_prime;
        self.c_prime = s.c_prime;
        self.d_prime = s.d_prime;
        self.e_prime = s.e_prime;
        self.h_prime = s.h_prime;
        self.l_prime = s.l_prime;
        self.set_ix(s.ix);
        self.set_iy(s.iy);
        self.sp = s.sp;
        self.pc = s.pc;
        self.i = s.i;
        self.set_r_register(s.r);
        self.iff1 = s.iff1;
        self.iff2 = s.iff2;
        self.im = s.im;
        self.halted = s.halted;
        self.tstates = s.tstates;
        self.interrupts_enabled_at = None;
    }
}
