use crate::core::Bus;
use crate::cpu::z80::tables::{HALFCARRY_SUB, PARITY, SZ53};
use crate::cpu::z80::{Flag, Z80};

// Every block instruction is one unit of work followed, for the repeating
// forms, by an optional rewind: PC -= 2 and 5 extra internal cycles, so the
// next main-loop iteration fetches the same ED-prefixed opcode again.
// Bit 3 of the opcode selects decrement (LDD/CPD/IND/OUTD and their repeats).

#[inline]
fn step(opcode: u8) -> u16 {
    if opcode & 0x08 != 0 { 0xFFFF } else { 1 }
}

impl Z80 {
    // --- Block Transfer ---

    /// Copy (HL) to (DE), BC--. Flags from (byte + A): bit 3 direct, bit 5 from bit 1.
    /// HL and DE are left for the caller to step.
    fn transfer_once(&mut self, bus: &mut dyn Bus) {
        let val = self.read_byte(bus, self.get_hl());
        self.set_bc(self.get_bc().wrapping_sub(1));
        let de = self.get_de();
        self.write_byte(bus, de, val);
        self.contend_write_no_mreq_loop(bus, de, 1, 2);

        let n = val.wrapping_add(self.a);
        let mut f = self.f & (Flag::C as u8 | Flag::Z as u8 | Flag::S as u8);
        if self.get_bc() != 0 { f |= Flag::PV as u8; }
        f |= n & Flag::X as u8;
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.f = f;
    }

    fn step_hl_de(&mut self, delta: u16) {
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_de(self.get_de().wrapping_add(delta));
    }

    /// LDI/LDD: 16 T: M1(4) + M1(4) + MR(3) + MW(3) + internal(2)
    /// LDI (0xA0): (DE)←(HL), HL++, DE++, BC--
    /// LDD (0xA8): (DE)←(HL), HL--, DE--, BC--
    pub(crate) fn op_ldi_ldd(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.transfer_once(bus);
        self.step_hl_de(step(opcode));
    }

    /// LDIR/LDDR: 21 T repeating / 16 T when done
    /// Repeats while BC != 0; the extra cycles are charged against DE.
    pub(crate) fn op_ldir_lddr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.transfer_once(bus);
        if self.get_bc() != 0 {
            self.contend_write_no_mreq_loop(bus, self.get_de(), 1, 5);
            self.pc = self.pc.wrapping_sub(2);
        }
        self.step_hl_de(step(opcode));
    }

    // --- Block Compare ---

    /// Compare A with (HL), BC--. HL is left for the caller to step.
    fn compare_once(&mut self, bus: &mut dyn Bus) {
        let hl = self.get_hl();
        let val = self.read_byte(bus, hl);
        let mut diff = self.a.wrapping_sub(val);
        let lookup = (((self.a & 0x08) >> 3) | ((val & 0x08) >> 2) | ((diff & 0x08) >> 1)) as usize;
        self.contend_read_no_mreq_loop(bus, hl, 1, 5);
        self.set_bc(self.get_bc().wrapping_sub(1));

        let mut f = (self.f & Flag::C as u8) | Flag::N as u8 | HALFCARRY_SUB[lookup] | (diff & Flag::S as u8);
        if self.get_bc() != 0 { f |= Flag::PV as u8; }
        if diff == 0 { f |= Flag::Z as u8; }
        // Undocumented bits 5/3 use the difference minus the half borrow.
        if (f & Flag::H as u8) != 0 {
            diff = diff.wrapping_sub(1);
        }
        f |= diff & Flag::X as u8;
        if (diff & 0x02) != 0 { f |= Flag::Y as u8; }
        self.f = f;
    }

    /// CPI/CPD: 16 T: M1(4) + M1(4) + MR(3) + internal(5)
    pub(crate) fn op_cpi_cpd(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.compare_once(bus);
        self.set_hl(self.get_hl().wrapping_add(step(opcode)));
    }

    /// CPIR/CPDR: 21 T repeating / 16 T when done
    /// Repeats while BC != 0 and no match was found.
    pub(crate) fn op_cpir_cpdr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.compare_once(bus);
        if (self.f & (Flag::PV as u8 | Flag::Z as u8)) == Flag::PV as u8 {
            self.contend_read_no_mreq_loop(bus, self.get_hl(), 1, 5);
            self.pc = self.pc.wrapping_sub(2);
        }
        self.set_hl(self.get_hl().wrapping_add(step(opcode)));
    }

    // --- Block I/O ---

    /// Flags shared by the block I/O family. `k` is the byte the port value is
    /// added to: C±1 for input, the updated L for output.
    fn block_io_flags(&mut self, val: u8, k: u8) {
        let sum = val as u16 + k as u16;
        let mut f = SZ53[self.b as usize] | PARITY[((sum as u8 & 0x07) ^ self.b) as usize];
        if (val & 0x80) != 0 { f |= Flag::N as u8; }
        if sum > 0xFF { f |= Flag::H as u8 | Flag::C as u8; }
        self.f = f;
    }

    /// Port (BC) into (HL), B--. HL is left for the caller to step.
    fn input_once(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        let val = self.read_port(bus, self.get_bc());
        self.write_byte(bus, self.get_hl(), val);
        self.b = self.b.wrapping_sub(1);
        let c = self.c.wrapping_add(step(opcode) as u8);
        self.block_io_flags(val, c);
    }

    /// INI/IND: 16 T: M1(4) + M1(5) + IO(4) + MW(3)
    pub(crate) fn op_ini_ind(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.input_once(bus, opcode);
        self.set_hl(self.get_hl().wrapping_add(step(opcode)));
    }

    /// INIR/INDR: 21 T repeating / 16 T when done
    pub(crate) fn op_inir_indr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.input_once(bus, opcode);
        if self.b != 0 {
            self.contend_write_no_mreq_loop(bus, self.get_hl(), 1, 5);
            self.pc = self.pc.wrapping_sub(2);
        }
        self.set_hl(self.get_hl().wrapping_add(step(opcode)));
    }

    /// (HL) out to port (BC), with B decremented before the port write. HL is stepped.
    fn output_once(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        let val = self.read_byte(bus, self.get_hl());
        self.b = self.b.wrapping_sub(1);
        self.write_port(bus, self.get_bc(), val);
        self.set_hl(self.get_hl().wrapping_add(step(opcode)));
        self.block_io_flags(val, self.l);
    }

    /// OUTI/OUTD: 16 T: M1(4) + M1(5) + MR(3) + IO(4)
    pub(crate) fn op_outi_outd(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.output_once(bus, opcode);
    }

    /// OTIR/OTDR: 21 T repeating / 16 T when done. Extra cycles are charged against BC.
    pub(crate) fn op_otir_otdr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.output_once(bus, opcode);
        if self.b != 0 {
            self.contend_read_no_mreq_loop(bus, self.get_bc(), 1, 5);
            self.pc = self.pc.wrapping_sub(2);
        }
    }
}
