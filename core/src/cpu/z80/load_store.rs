use crate::core::Bus;
use crate::cpu::z80::tables::{SZ53, SZ53P};
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// LD r, r': 4 T; LD r, (HL) / LD (HL), r: 7 T
    pub(crate) fn op_ld_r_r(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let dst = (opcode >> 3) & 0x07;
        let src = opcode & 0x07;
        let val = if src == 6 {
            self.read_byte(bus, self.get_hl())
        } else {
            self.get_reg8(src)
        };
        if dst == 6 {
            self.write_byte(bus, self.get_hl(), val);
        } else {
            self.set_reg8(dst, val);
        }
    }

    /// LD r, n: 7 T; LD (HL), n: 10 T
    pub(crate) fn op_ld_r_n(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let r = (opcode >> 3) & 0x07;
        let n = self.fetch_operand(bus);
        if r == 6 {
            self.write_byte(bus, self.get_hl(), n);
        } else {
            self.set_reg8(r, n);
        }
    }

    /// LD rr, nn: 10 T
    pub(crate) fn op_ld_rr_nn(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let val = self.fetch_word(bus);
        self.set_rp((opcode >> 4) & 0x03, val);
    }

    /// LD (BC), A / LD (DE), A: 7 T
    pub(crate) fn op_ld_rp_a(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.get_rp((opcode >> 4) & 0x01);
        self.write_byte(bus, addr, self.a);
    }

    /// LD A, (BC) / LD A, (DE): 7 T
    pub(crate) fn op_ld_a_rp(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.get_rp((opcode >> 4) & 0x01);
        self.a = self.read_byte(bus, addr);
    }

    /// LD (nn), A: 13 T
    pub(crate) fn op_ld_nn_a(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let addr = self.fetch_word(bus);
        self.write_byte(bus, addr, self.a);
    }

    /// LD A, (nn): 13 T
    pub(crate) fn op_ld_a_nn(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let addr = self.fetch_word(bus);
        self.a = self.read_byte(bus, addr);
    }

    /// Store a word at (nn), low byte first.
    fn store_word_at_operand(&mut self, bus: &mut dyn Bus, val: u16) {
        let addr = self.fetch_word(bus);
        let [lo, hi] = val.to_le_bytes();
        self.write_byte(bus, addr, lo);
        self.write_byte(bus, addr.wrapping_add(1), hi);
    }

    /// Load a word from (nn), low byte first.
    fn load_word_at_operand(&mut self, bus: &mut dyn Bus) -> u16 {
        let addr = self.fetch_word(bus);
        let lo = self.read_byte(bus, addr);
        let hi = self.read_byte(bus, addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// LD (nn), HL: 16 T
    pub(crate) fn op_ld_nn_hl(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.store_word_at_operand(bus, self.get_hl());
    }

    /// LD HL, (nn): 16 T
    pub(crate) fn op_ld_hl_nn_ind(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let val = self.load_word_at_operand(bus);
        self.set_hl(val);
    }

    /// LD (nn), rr (ED 43/53/63/73): 20 T
    pub(crate) fn op_ld_nn_rr_ed(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.store_word_at_operand(bus, self.get_rp((opcode >> 4) & 0x03));
    }

    /// LD rr, (nn) (ED 4B/5B/6B/7B): 20 T
    pub(crate) fn op_ld_rr_nn_ed(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let val = self.load_word_at_operand(bus);
        self.set_rp((opcode >> 4) & 0x03, val);
    }

    /// LD SP, HL: 6 T
    pub(crate) fn op_ld_sp_hl(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 2);
        self.sp = self.get_hl();
    }

    /// EX AF, AF': 4 T
    pub(crate) fn op_ex_af_af(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
    }

    /// EXX: 4 T
    pub(crate) fn op_exx(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
    }

    /// EX DE, HL: 4 T
    pub(crate) fn op_ex_de_hl(&mut self, _bus: &mut dyn Bus, _opcode: u8) {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
    }

    /// Exchange a word with the top of the stack and return the old stack word.
    /// Read (SP), read (SP+1), 1 internal, write (SP+1), write (SP), 2 internal.
    fn exchange_sp(&mut self, bus: &mut dyn Bus, val: u16) -> u16 {
        let sp = self.sp;
        let lo = self.read_byte(bus, sp);
        let hi = self.read_byte(bus, sp.wrapping_add(1));
        self.contend_read_no_mreq(bus, sp.wrapping_add(1), 1);
        let [new_lo, new_hi] = val.to_le_bytes();
        self.write_byte(bus, sp.wrapping_add(1), new_hi);
        self.write_byte(bus, sp, new_lo);
        self.contend_write_no_mreq_loop(bus, sp, 1, 2);
        u16::from_le_bytes([lo, hi])
    }

    /// EX (SP), HL: 19 T
    pub(crate) fn op_ex_sp_hl(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let val = self.exchange_sp(bus, self.get_hl());
        self.set_hl(val);
    }

    /// LD I, A (ED 47): 9 T
    pub(crate) fn op_ld_i_a(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.i = self.a;
    }

    /// LD R, A (ED 4F): 9 T. Also sets the stored bit 7.
    pub(crate) fn op_ld_r_a(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.set_r_register(self.a);
    }

    /// LD A, I (ED 57): 9 T. PV reflects IFF2.
    pub(crate) fn op_ld_a_i(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.a = self.i;
        self.set_ld_a_ir_flags();
    }

    /// LD A, R (ED 5F): 9 T. PV reflects IFF2.
    pub(crate) fn op_ld_a_r(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.a = self.r_register();
        self.set_ld_a_ir_flags();
    }

    fn set_ld_a_ir_flags(&mut self) {
        let mut f = (self.f & Flag::C as u8) | SZ53[self.a as usize];
        if self.iff2 { f |= Flag::PV as u8; }
        self.f = f;
    }

    /// RRD (ED 67): 18 T. Low nibble of (HL) into A, A's low nibble into (HL)'s high nibble.
    pub(crate) fn op_rrd(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let hl = self.get_hl();
        let val = self.read_byte(bus, hl);
        self.contend_read_no_mreq_loop(bus, hl, 1, 4);
        self.write_byte(bus, hl, (self.a << 4) | (val >> 4));
        self.a = (self.a & 0xF0) | (val & 0x0F);
        self.f = (self.f & Flag::C as u8) | SZ53P[self.a as usize];
    }

    /// RLD (ED 6F): 18 T. High nibble of (HL) into A, A's low nibble into (HL)'s low nibble.
    pub(crate) fn op_rld(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let hl = self.get_hl();
        let val = self.read_byte(bus, hl);
        self.contend_read_no_mreq_loop(bus, hl, 1, 4);
        self.write_byte(bus, hl, (val << 4) | (self.a & 0x0F));
        self.a = (self.a & 0xF0) | (val >> 4);
        self.f = (self.f & Flag::C as u8) | SZ53P[self.a as usize];
    }

    // --- Indexed (DD/FD) ---

    /// LD IX, nn: 14 T
    pub(crate) fn op_ld_index_nn<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let val = self.fetch_word(bus);
        self.set_index::<IY>(val);
    }

    /// LD (nn), IX: 20 T
    pub(crate) fn op_ld_nn_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.store_word_at_operand(bus, self.get_index::<IY>());
    }

    /// LD IX, (nn): 20 T
    pub(crate) fn op_ld_index_nn_ind<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let val = self.load_word_at_operand(bus);
        self.set_index::<IY>(val);
    }

    /// LD IXH, n / LD IXL, n: 11 T
    pub(crate) fn op_ld_index_half_n<const IY: bool>(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let n = self.fetch_operand(bus);
        self.set_reg8_index::<IY>((opcode >> 3) & 0x07, n);
    }

    /// LD (IX+d), n: 19 T. The operand read overlaps the address computation.
    pub(crate) fn op_ld_index_mem_n<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let displacement = self.fetch_operand(bus) as i8;
        let n = self.read_byte(bus, self.pc);
        self.contend_read_no_mreq_loop(bus, self.pc, 1, 2);
        self.pc = self.pc.wrapping_add(1);
        let addr = self.get_index::<IY>().wrapping_add(displacement as u16);
        self.write_byte(bus, addr, n);
    }

    /// LD r, (IX+d): 19 T. H and L here are the real H and L.
    pub(crate) fn op_ld_r_index_mem<const IY: bool>(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.index_address::<IY>(bus);
        let val = self.read_byte(bus, addr);
        self.set_reg8((opcode >> 3) & 0x07, val);
    }

    /// LD (IX+d), r: 19 T
    pub(crate) fn op_ld_index_mem_r<const IY: bool>(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let addr = self.index_address::<IY>(bus);
        self.write_byte(bus, addr, self.get_reg8(opcode & 0x07));
    }

    /// LD r, r' with H/L meaning IXH/IXL: 8 T
    pub(crate) fn op_ld_index_r_r<const IY: bool>(&mut self, _bus: &mut dyn Bus, opcode: u8) {
        let val = self.get_reg8_index::<IY>(opcode & 0x07);
        self.set_reg8_index::<IY>((opcode >> 3) & 0x07, val);
    }

    /// LD SP, IX: 10 T
    pub(crate) fn op_ld_sp_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq_loop(bus, self.ir(), 1, 2);
        self.sp = self.get_index::<IY>();
    }

    /// EX (SP), IX: 23 T
    pub(crate) fn op_ex_sp_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let val = self.exchange_sp(bus, self.get_index::<IY>());
        self.set_index::<IY>(val);
    }
}
