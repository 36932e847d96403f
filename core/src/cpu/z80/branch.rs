use crate::core::Bus;
use crate::cpu::z80::Z80;

impl Z80 {
    /// Relative jump: displacement at PC, 5 internal cycles, PC past the operand.
    fn jr(&mut self, bus: &mut dyn Bus) {
        let offset = self.read_byte(bus, self.pc) as i8;
        self.contend_read_no_mreq_loop(bus, self.pc, 1, 5);
        self.pc = self.pc.wrapping_add(offset as u16).wrapping_add(1);
    }

    /// Untaken relative jump: the displacement is still read (3 T).
    fn skip_jr(&mut self, bus: &mut dyn Bus) {
        self.contend_read(bus, self.pc, 3);
        self.pc = self.pc.wrapping_add(1);
    }

    /// Untaken JP cc / CALL cc: both operand bytes are still read (3 T + 3 T).
    fn skip_word(&mut self, bus: &mut dyn Bus) {
        self.contend_read(bus, self.pc, 3);
        self.contend_read(bus, self.pc.wrapping_add(1), 3);
        self.pc = self.pc.wrapping_add(2);
    }

    fn call(&mut self, bus: &mut dyn Bus) {
        let lo = self.fetch_operand(bus);
        let hi = self.read_byte(bus, self.pc);
        self.contend_read_no_mreq(bus, self.pc, 1);
        self.pc = self.pc.wrapping_add(1);
        self.push16(bus, self.pc);
        self.pc = u16::from_le_bytes([lo, hi]);
    }

    /// JP nn: 10 T
    pub(crate) fn op_jp_nn(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.pc = self.fetch_word(bus);
    }

    /// JP cc, nn: 10 T taken or not
    pub(crate) fn op_jp_cc_nn(&mut self, bus: &mut dyn Bus, opcode: u8) {
        if self.condition((opcode >> 3) & 0x07) {
            self.pc = self.fetch_word(bus);
        } else {
            self.skip_word(bus);
        }
    }

    /// JR e: 12 T
    pub(crate) fn op_jr_e(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.jr(bus);
    }

    /// JR cc, e: 12 T taken / 7 T not taken. Only NZ, Z, NC, C.
    pub(crate) fn op_jr_cc_e(&mut self, bus: &mut dyn Bus, opcode: u8) {
        if self.condition((opcode >> 3) & 0x03) {
            self.jr(bus);
        } else {
            self.skip_jr(bus);
        }
    }

    /// JP (HL): 4 T
    pub(crate) fn op_jp_hl(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.pc = self.get_hl();
    }

    /// JP (IX): 8 T
    pub(crate) fn op_jp_index<const IY: bool>(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.pc = self.get_index::<IY>();
    }

    /// DJNZ e: 13 T taken / 8 T not taken
    pub(crate) fn op_djnz(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.b = self.b.wrapping_sub(1);
        if self.b != 0 {
            self.jr(bus);
        } else {
            self.skip_jr(bus);
        }
    }

    /// CALL nn: 17 T
    pub(crate) fn op_call_nn(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.call(bus);
    }

    /// CALL cc, nn: 17 T taken / 10 T not taken
    pub(crate) fn op_call_cc_nn(&mut self, bus: &mut dyn Bus, opcode: u8) {
        if self.condition((opcode >> 3) & 0x07) {
            self.call(bus);
        } else {
            self.skip_word(bus);
        }
    }

    /// RET: 10 T
    pub(crate) fn op_ret(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.pc = self.pop16(bus);
    }

    /// RET cc: 11 T taken / 5 T not taken
    pub(crate) fn op_ret_cc(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        if self.condition((opcode >> 3) & 0x07) {
            self.pc = self.pop16(bus);
        }
    }

    /// RST p: 11 T
    pub(crate) fn op_rst(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.push16(bus, self.pc);
        self.pc = (opcode & 0x38) as u16;
    }

    /// RETN/RETI (ED 45 and aliases): 14 T. IFF1 is restored from IFF2.
    pub(crate) fn op_retn(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.iff1 = self.iff2;
        self.pc = self.pop16(bus);
    }

    /// HALT: 4 T. PC is rewound so the halted loop keeps refetching this opcode.
    pub(crate) fn op_halt(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.halted = true;
        self.pc = self.pc.wrapping_sub(1);
    }

    /// DI: 4 T
    pub(crate) fn op_di(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.iff1 = false;
        self.iff2 = false;
    }

    /// EI: 4 T. Interrupts stay blocked until the next instruction has run.
    pub(crate) fn op_ei(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        self.iff1 = true;
        self.iff2 = true;
        self.interrupts_enabled_at = Some(self.tstates);
    }

    /// IM 0/1/2 (ED 46/56/5E and aliases): 8 T
    pub(crate) fn op_im(&mut self, _bus: &mut dyn Bus, opcode: u8) {
        self.im = match (opcode >> 3) & 0x03 {
            0 | 1 => 0,
            2 => 1,
            _ => 2,
        };
    }
}
