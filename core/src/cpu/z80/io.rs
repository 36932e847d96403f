use crate::core::Bus;
use crate::cpu::z80::tables::SZ53P;
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// IN A, (n): 11 T. Port high byte is A. Flags unaffected.
    pub(crate) fn op_in_a_n(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let n = self.fetch_operand(bus);
        let port = ((self.a as u16) << 8) | n as u16;
        self.a = self.read_port(bus, port);
    }

    /// OUT (n), A: 11 T
    pub(crate) fn op_out_n_a(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let n = self.fetch_operand(bus);
        let port = ((self.a as u16) << 8) | n as u16;
        self.write_port(bus, port, self.a);
    }

    /// IN r, (C) (ED 40-78): 12 T. ED 70 sets flags only (IN F,(C)).
    pub(crate) fn op_in_r_c(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let val = self.read_port(bus, self.get_bc());
        self.f = (self.f & Flag::C as u8) | SZ53P[val as usize];
        let r = (opcode >> 3) & 0x07;
        if r != 6 {
            self.set_reg8(r, val);
        }
    }

    /// OUT (C), r (ED 41-79): 12 T. ED 71 writes 0.
    pub(crate) fn op_out_c_r(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let r = (opcode >> 3) & 0x07;
        let val = if r == 6 { 0 } else { self.get_reg8(r) };
        self.write_port(bus, self.get_bc(), val);
    }
}
