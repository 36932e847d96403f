use crate::core::Bus;
use crate::cpu::z80::tables::SZ53P;
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- Rotate/shift primitives ---
    // Carry takes the bit shifted out; S, Z, bits 5/3 and parity come from the result.

    pub fn alu_rlc(&mut self, val: u8) -> u8 {
        let result = val.rotate_left(1);
        self.f = (result & Flag::C as u8) | SZ53P[result as usize];
        result
    }

    pub fn alu_rrc(&mut self, val: u8) -> u8 {
        let result = val.rotate_right(1);
        self.f = (val & Flag::C as u8) | SZ53P[result as usize];
        result
    }

    pub fn alu_rl(&mut self, val: u8) -> u8 {
        let result = (val << 1) | (self.f & Flag::C as u8);
        self.f = (val >> 7) | SZ53P[result as usize];
        result
    }

    pub fn alu_rr(&mut self, val: u8) -> u8 {
        let result = (val >> 1) | ((self.f & Flag::C as u8) << 7);
        self.f = (val & Flag::C as u8) | SZ53P[result as usize];
        result
    }

    pub fn alu_sla(&mut self, val: u8) -> u8 {
        let result = val << 1;
        self.f = (val >> 7) | SZ53P[result as usize];
        result
    }

    /// Arithmetic shift right: bit 7 is replicated.
    pub fn alu_sra(&mut self, val: u8) -> u8 {
        let result = (val & 0x80) | (val >> 1);
        self.f = (val & Flag::C as u8) | SZ53P[result as usize];
        result
    }

    /// Undocumented shift left that feeds a 1 into bit 0.
    pub fn alu_sll(&mut self, val: u8) -> u8 {
        let result = (val << 1) | 0x01;
        self.f = (val >> 7) | SZ53P[result as usize];
        result
    }

    pub fn alu_srl(&mut self, val: u8) -> u8 {
        let result = val >> 1;
        self.f = (val & Flag::C as u8) | SZ53P[result as usize];
        result
    }

    /// Perform CB rotate/shift operation on a value.
    /// op: 0=RLC, 1=RRC, 2=RL, 3=RR, 4=SLA, 5=SRA, 6=SLL(undoc), 7=SRL.
    fn rotate_shift(&mut self, op: u8, val: u8) -> u8 {
        match op {
            0 => self.alu_rlc(val),
            1 => self.alu_rrc(val),
            2 => self.alu_rl(val),
            3 => self.alu_rr(val),
            4 => self.alu_sla(val),
            5 => self.alu_sra(val),
            6 => self.alu_sll(val),
            7 => self.alu_srl(val),
            _ => unreachable!("rotate_shift called with op {}", op),
        }
    }

    /// BIT n, v with bits 5/3 taken from the tested value.
    pub fn alu_bit(&mut self, n: u8, val: u8) {
        self.set_bit_flags(n, val, val);
    }

    /// BIT n, (IX+d): bits 5/3 come from the high byte of the effective address.
    pub fn alu_biti(&mut self, n: u8, val: u8, address: u16) {
        self.set_bit_flags(n, val, (address >> 8) as u8);
    }

    fn set_bit_flags(&mut self, n: u8, val: u8, undocumented: u8) {
        let mut f = (self.f & Flag::C as u8)
            | Flag::H as u8
            | (undocumented & (Flag::X as u8 | Flag::Y as u8));
        if val & (1 << n) == 0 { f |= Flag::PV as u8 | Flag::Z as u8; }
        if n == 7 && val & 0x80 != 0 { f |= Flag::S as u8; }
        self.f = f;
    }

    /// RES (op bit 6 clear) or SET (op bit 6 set) of bit (op >> 3) & 7.
    fn res_set(opcode: u8, val: u8) -> u8 {
        let mask = 1u8 << ((opcode >> 3) & 0x07);
        if opcode & 0x40 != 0 { val | mask } else { val & !mask }
    }

    // --- CB prefix ---

    /// RLC/RRC/RL/RR/SLA/SRA/SLL/SRL r: 8 T; (HL): 15 T
    pub(crate) fn op_cb_rot(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let op = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;
        if r == 6 {
            let addr = self.get_hl();
            let val = self.read_byte(bus, addr);
            self.contend_read_no_mreq(bus, addr, 1);
            let result = self.rotate_shift(op, val);
            self.write_byte(bus, addr, result);
        } else {
            let result = self.rotate_shift(op, self.get_reg8(r));
            self.set_reg8(r, result);
        }
    }

    /// BIT n, r: 8 T; BIT n, (HL): 12 T
    pub(crate) fn op_cb_bit(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let n = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;
        if r == 6 {
            let addr = self.get_hl();
            let val = self.read_byte(bus, addr);
            self.contend_read_no_mreq(bus, addr, 1);
            self.alu_bit(n, val);
        } else {
            self.alu_bit(n, self.get_reg8(r));
        }
    }

    /// RES/SET n, r: 8 T; (HL): 15 T. Flags unaffected.
    pub(crate) fn op_cb_res_set(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let r = opcode & 0x07;
        if r == 6 {
            let addr = self.get_hl();
            let val = self.read_byte(bus, addr);
            self.contend_read_no_mreq(bus, addr, 1);
            self.write_byte(bus, addr, Self::res_set(opcode, val));
        } else {
            self.set_reg8(r, Self::res_set(opcode, self.get_reg8(r)));
        }
    }

    // --- DD CB / FD CB ---
    // Operate on effective_addr. With a register field other than 6 the result
    // is also copied into that register (undocumented).

    /// Rotate/shift (IX+d): 23 T
    pub(crate) fn op_index_cb_rot(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.effective_addr;
        let val = self.read_byte(bus, addr);
        self.contend_read_no_mreq(bus, addr, 1);
        let result = self.rotate_shift((opcode >> 3) & 0x07, val);
        let r = opcode & 0x07;
        if r != 6 {
            self.set_reg8(r, result);
        }
        self.write_byte(bus, addr, result);
    }

    /// BIT n, (IX+d): 20 T. All eight register encodings behave the same.
    pub(crate) fn op_index_cb_bit(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.effective_addr;
        let val = self.read_byte(bus, addr);
        self.contend_read_no_mreq(bus, addr, 1);
        self.alu_biti((opcode >> 3) & 0x07, val, addr);
    }

    /// RES/SET n, (IX+d): 23 T
    pub(crate) fn op_index_cb_res_set(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.effective_addr;
        let val = self.read_byte(bus, addr);
        self.contend_read_no_mreq(bus, addr, 1);
        let result = Self::res_set(opcode, val);
        let r = opcode & 0x07;
        if r != 6 {
            self.set_reg8(r, result);
        }
        self.write_byte(bus, addr, result);
    }
}
