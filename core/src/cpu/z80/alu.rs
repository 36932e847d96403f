use crate::core::Bus;
use crate::cpu::z80::tables::{
    HALFCARRY_ADD, HALFCARRY_SUB, OVERFLOW_ADD, OVERFLOW_SUB, PARITY, SZ53, SZ53P, lookup8, lookup16,
};
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- ALU Primitives ---
    // Each updates A (or the target) and F; nothing else is returned.

    pub fn alu_add(&mut self, val: u8) {
        let result = self.a as u16 + val as u16;
        self.set_add_flags(val, result);
    }

    pub fn alu_adc(&mut self, val: u8) {
        let result = self.a as u16 + val as u16 + (self.f & Flag::C as u8) as u16;
        self.set_add_flags(val, result);
    }

    fn set_add_flags(&mut self, val: u8, result: u16) {
        let lookup = lookup8(self.a, val, result as u8);
        self.a = result as u8;
        let mut f = HALFCARRY_ADD[lookup & 7] | OVERFLOW_ADD[lookup >> 4] | SZ53[self.a as usize];
        if result & 0x100 != 0 { f |= Flag::C as u8; }
        self.f = f;
    }

    pub fn alu_sub(&mut self, val: u8) {
        let result = (self.a as u16).wrapping_sub(val as u16);
        self.set_sub_flags(val, result);
    }

    pub fn alu_sbc(&mut self, val: u8) {
        let result = (self.a as u16)
            .wrapping_sub(val as u16)
            .wrapping_sub((self.f & Flag::C as u8) as u16);
        self.set_sub_flags(val, result);
    }

    fn set_sub_flags(&mut self, val: u8, result: u16) {
        let lookup = lookup8(self.a, val, result as u8);
        self.a = result as u8;
        let mut f = Flag::N as u8
            | HALFCARRY_SUB[lookup & 7]
            | OVERFLOW_SUB[lookup >> 4]
            | SZ53[self.a as usize];
        if result & 0x100 != 0 { f |= Flag::C as u8; }
        self.f = f;
    }

    /// Compare: flags as for SUB, A untouched, bits 5/3 from the operand.
    pub fn alu_cp(&mut self, val: u8) {
        let result = (self.a as u16).wrapping_sub(val as u16);
        let lookup = lookup8(self.a, val, result as u8);
        let mut f = Flag::N as u8
            | HALFCARRY_SUB[lookup & 7]
            | OVERFLOW_SUB[lookup >> 4]
            | (val & (Flag::X as u8 | Flag::Y as u8))
            | (result as u8 & Flag::S as u8);
        if result & 0x100 != 0 {
            f |= Flag::C as u8;
        } else if result == 0 {
            f |= Flag::Z as u8;
        }
        self.f = f;
    }

    pub fn alu_and(&mut self, val: u8) {
        self.a &= val;
        self.f = Flag::H as u8 | SZ53P[self.a as usize];
    }

    pub fn alu_xor(&mut self, val: u8) {
        self.a ^= val;
        self.f = SZ53P[self.a as usize];
    }

    pub fn alu_or(&mut self, val: u8) {
        self.a |= val;
        self.f = SZ53P[self.a as usize];
    }

    /// 8-bit increment; C is preserved.
    pub fn alu_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = (self.f & Flag::C as u8) | SZ53[result as usize];
        if result == 0x80 { f |= Flag::PV as u8; }
        if result & 0x0F == 0 { f |= Flag::H as u8; }
        self.f = f;
        result
    }

    /// 8-bit decrement; C is preserved.
    pub fn alu_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8 | SZ53[result as usize];
        if val & 0x0F == 0 { f |= Flag::H as u8; }
        if result == 0x7F { f |= Flag::PV as u8; }
        self.f = f;
        result
    }

    /// ADD HL/IX/IY, rr: S, Z and PV preserved; H from bit 11; bits 5/3 from the high byte.
    pub fn alu_add16(&mut self, lhs: u16, val: u16) -> u16 {
        let result = lhs as u32 + val as u32;
        let lookup = lookup16(lhs, val, result);
        let mut f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | ((result >> 8) as u8 & (Flag::X as u8 | Flag::Y as u8))
            | HALFCARRY_ADD[lookup & 7];
        if result & 0x10000 != 0 { f |= Flag::C as u8; }
        self.f = f;
        result as u16
    }

    pub fn alu_adc16(&mut self, val: u16) {
        let hl = self.get_hl();
        let result = hl as u32 + val as u32 + (self.f & Flag::C as u8) as u32;
        let lookup = lookup16(hl, val, result);
        self.set_hl(result as u16);
        let mut f = OVERFLOW_ADD[lookup >> 4]
            | (self.h & (Flag::X as u8 | Flag::Y as u8 | Flag::S as u8))
            | HALFCARRY_ADD[lookup & 7];
        if result & 0x10000 != 0 { f |= Flag::C as u8; }
        if self.get_hl() == 0 { f |= Flag::Z as u8; }
        self.f = f;
    }

    pub fn alu_sbc16(&mut self, val: u16) {
        let hl = self.get_hl();
        let result = (hl as u32)
            .wrapping_sub(val as u32)
            .wrapping_sub((self.f & Flag::C as u8) as u32);
        let lookup = lookup16(hl, val, result);
        self.set_hl(result as u16);
        let mut f = Flag::N as u8
            | OVERFLOW_SUB[lookup >> 4]
            | (self.h & (Flag::X as u8 | Flag::Y as u8 | Flag::S as u8))
            | HALFCARRY_SUB[lookup & 7];
        if result & 0x10000 != 0 { f |= Flag::C as u8; }
        if self.get_hl() == 0 { f |= Flag::Z as u8; }
        self.f = f;
    }

    /// Decimal adjust A after a BCD add or subtract.
    pub fn alu_daa(&mut self) {
        let mut correction = 0;
        let mut carry = self.f & Flag::C as u8;
        if (self.f & Flag::H as u8) != 0 || (self.a & 0x0F) > 9 {
            correction = 0x06;
        }
        if carry != 0 || self.a > 0x99 {
            correction |= 0x60;
        }
        if self.a > 0x99 {
            carry = Flag::C as u8;
        }
        if (self.f & Flag::N as u8) != 0 {
            self.alu_sub(correction);
        } else {
            self.alu_add(correction);
        }
        self.f = (self.f & !(Flag::C as u8 | Flag::PV as u8)) | carry | PARITY[self.a as usize];
    }

    fn perform_alu_op(&mut self, op: u8, val: u8) {
        match op {
            0 => self.alu_add(val),
            1 => self.alu_adc(val),
            2 => self.alu_sub(val),
            3 => self.alu_sbc(val),
            4 => self.alu_and(val),
            5 => self.alu_xor(val),
            6 => self.alu_or(val),
            7 => self.alu_cp(val),
            _ => unreachable!("perform_alu_op called with op {}", op),
        }
    }

    // --- Instructions ---

    /// ALU A, r: 4 T (reg) or 7 T ((HL))
    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP
    /// Opcode mask: 10 xxx zzz
    pub(crate) fn op_alu_r(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let r = opcode & 0x07;
        let val = if r == 6 {
            self.read_byte(bus, self.get_hl())
        } else {
            self.get_reg8(r)
        };
        self.perform_alu_op((opcode >> 3) & 0x07, val);
    }

    /// ALU A, n: 7 T
    pub(crate) fn op_alu_n(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let val = self.fetch_operand(bus);
        self.perform_alu_op((opcode >> 3) & 0x07, val);
    }

    /// INC r: 4 T; INC (HL): 11 T (read, 1 internal, write)
    pub(crate) fn op_inc_r(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let addr = self.get_hl();
            let val = self.read_byte(bus, addr);
            self.contend_read_no_mreq(bus, addr, 1);
            let result = self.alu_inc(val);
            self.write_byte(bus, addr, result);
        } else {
            let result = self.alu_inc(self.get_reg8(r));
            self.set_reg8(r, result);
        }
    }

    /// DEC r: 4 T; DEC (HL): 11 T
    pub(crate) fn op_dec_r(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let addr = self.get_hl();
            let val = self.read_byte(bus, addr);
            self.contend_read_no_mreq(bus, addr, 1);
            let result = self.alu_dec(val);
            self.write_byte(bus, addr, result);
        } else {
            let result = self.alu_dec(self.get_reg8(r));
            self.set_reg8(r, result);
        }
    }

    /// INC rr: 6 T
    pub(crate) fn op_inc_rr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 2);
        let rp = (opcode >> 4) & 0x03;
        self.set_rp(rp, self.get_rp(rp).wrapping_add(1));
    }

    /// DEC rr: 6 T
    pub(crate) fn op_dec_rr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 2);
        let rp = (opcode >> 4) & 0x03;
        self.set_rp(rp, self.get_rp(rp).wrapping_sub(1));
    }

    /// ADD HL, rr: 11 T
    pub(crate) fn op_add_hl_rr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 7);
        let val = self.get_rp((opcode >> 4) & 0x03);
        let result = self.alu_add16(self.get_hl(), val);
        self.set_hl(result);
    }

    /// ADC HL, rr (ED 4A/5A/6A/7A): 15 T
    pub(crate) fn op_adc_hl_rr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 7);
        self.alu_adc16(self.get_rp((opcode >> 4) & 0x03));
    }

    /// SBC HL, rr (ED 42/52/62/72): 15 T
    pub(crate) fn op_sbc_hl_rr(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 7);
        self.alu_sbc16(self.get_rp((opcode >> 4) & 0x03));
    }

    /// NEG (ED 44 and its seven aliases): 8 T
    pub(crate) fn op_neg(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        let val = self.a;
        self.a = 0;
        self.alu_sub(val);
    }

    /// DAA: 4 T
    pub(crate) fn op_daa(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.alu_daa();
    }

    /// CPL: 4 T. Sets H and N.
    pub(crate) fn op_cpl(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.a ^= 0xFF;
        self.f = (self.f & (Flag::C as u8 | Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | (self.a & (Flag::X as u8 | Flag::Y as u8))
            | Flag::N as u8
            | Flag::H as u8;
    }

    /// SCF: 4 T
    pub(crate) fn op_scf(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | (self.a & (Flag::X as u8 | Flag::Y as u8))
            | Flag::C as u8;
    }

    /// CCF: 4 T. H takes the old carry.
    pub(crate) fn op_ccf(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        let carry = if self.flag(Flag::C) { Flag::H as u8 } else { Flag::C as u8 };
        self.f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | carry
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
    }

    /// RLCA: 4 T
    pub(crate) fn op_rlca(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.a = self.a.rotate_left(1);
        self.f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | (self.a & (Flag::C as u8 | Flag::X as u8 | Flag::Y as u8));
    }

    /// RRCA: 4 T
    pub(crate) fn op_rrca(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        let carry = self.a & Flag::C as u8;
        self.a = self.a.rotate_right(1);
        self.f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | carry
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
    }

    /// RLA: 4 T
    pub(crate) fn op_rla(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        let old = self.a;
        self.a = (old << 1) | (self.f & Flag::C as u8);
        self.f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | (self.a & (Flag::X as u8 | Flag::Y as u8))
            | (old >> 7);
    }

    /// RRA: 4 T
    pub(crate) fn op_rra(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        let old = self.a;
        self.a = (old >> 1) | ((self.f & Flag::C as u8) << 7);
        self.f = (self.f & (Flag::PV as u8 | Flag::Z as u8 | Flag::S as u8))
            | (self.a & (Flag::X as u8 | Flag::Y as u8))
            | (old & Flag::C as u8);
    }

    // --- Indexed (DD/FD) ---

    /// Read the displacement at PC and return IX/IY+d.
    /// 3 T read plus 5 internal cycles on the displacement address.
    pub(crate) fn index_address<const IY: bool>(&mut self, bus: &mut dyn Bus) -> u16 {
        let displacement = self.read_byte(bus, self.pc) as i8;
        self.contend_read_no_mreq_loop(bus, self.pc, 1, 5);
        self.pc = self.pc.wrapping_add(1);
        self.get_index::<IY>().wrapping_add(displacement as u16)
    }

    /// ALU A, (IX+d): 19 T
    pub(crate) fn op_alu_index_mem<const IY: bool>(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.index_address::<IY>(bus);
        let val = self.read_byte(bus, addr);
        self.perform_alu_op((opcode >> 3) & 0x07, val);
    }

    /// ALU A, IXH/IXL: 8 T
    pub(crate) fn op_alu_index_r<const IY: bool>(&mut self, _bus: &mut dyn Bus, opcode: u8) {
        let val = self.get_reg8_index::<IY>(opcode & 0x07);
        self.perform_alu_op((opcode >> 3) & 0x07, val);
    }

    /// INC IXH/IXL: 8 T
    pub(crate) fn op_inc_index_half<const IY: bool>(&mut self, _bus: &mut dyn Bus, opcode: u8) {
        let r = (opcode >> 3) & 0x07;
        let result = self.alu_inc(self.get_reg8_index::<IY>(r));
        self.set_reg8_index::<IY>(r, result);
    }

    /// DEC IXH/IXL: 8 T
    pub(crate) fn op_dec_index_half<const IY: bool>(&mut self, _bus: &mut dyn Bus, opcode: u8) {
        let r = (opcode >> 3) & 0x07;
        let result = self.alu_dec(self.get_reg8_index::<IY>(r));
        self.set_reg8_index::<IY>(r, result);
    }

    /// INC (IX+d): 23 T
    pub(crate) fn op_inc_index_mem<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let addr = self.index_address::<IY>(bus);
        let val = self.read_byte(bus, addr);
        self.contend_read_no_mreq(bus, addr, 1);
        let result = self.alu_inc(val);
        self.write_byte(bus, addr, result);
    }

    /// DEC (IX+d): 23 T
    pub(crate) fn op_dec_index_mem<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let addr = self.index_address::<IY>(bus);
        let val = self.read_byte(bus, addr);
        self.contend_read_no_mreq(bus, addr, 1);
        let result = self.alu_dec(val);
        self.write_byte(bus, addr, result);
    }

    /// INC IX: 10 T
    pub(crate) fn op_inc_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 2);
        self.set_index::<IY>(self.get_index::<IY>().wrapping_add(1));
    }

    /// DEC IX: 10 T
    pub(crate) fn op_dec_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 2);
        self.set_index::<IY>(self.get_index::<IY>().wrapping_sub(1));
    }

    /// ADD IX, rr: 15 T. rr index 2 is IX itself.
    pub(crate) fn op_add_index_rr<const IY: bool>(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 7);
        let val = self.get_rp_index::<IY>((opcode >> 4) & 0x03);
        let result = self.alu_add16(self.get_index::<IY>(), val);
        self.set_index::<IY>(result);
    }
}
