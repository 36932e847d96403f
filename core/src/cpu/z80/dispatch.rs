//! Opcode table and prefix decoding.
//!
//! One flat table of handler slots, partitioned into six 256-entry regions.
//! Each region is described by a `const fn` that decodes an opcode byte into
//! its handler, and the whole table is evaluated at compile time. Handlers
//! receive the opcode byte and decode register/condition fields from it.

use crate::core::Bus;
use crate::cpu::z80::Z80;

pub(crate) type Handler = fn(&mut Z80, &mut dyn Bus, u8);

pub(crate) const CB_BASE: usize = 256;
pub(crate) const ED_BASE: usize = 512;
pub(crate) const DD_BASE: usize = 768;
pub(crate) const INDEX_CB_BASE: usize = 1024;
pub(crate) const FD_BASE: usize = 1280;
pub const TABLE_SIZE: usize = 1536;

pub(crate) static OPCODES: [Option<Handler>; TABLE_SIZE] = build_table();

const fn build_table() -> [Option<Handler>; TABLE_SIZE] {
    let mut table: [Option<Handler>; TABLE_SIZE] = [None; TABLE_SIZE];
    let mut i = 0;
    while i < 256 {
        let op = i as u8;
        table[i] = Some(plain(op));
        table[CB_BASE + i] = Some(cb(op));
        table[ED_BASE + i] = Some(ed(op));
        table[DD_BASE + i] = indexed::<false>(op);
        table[INDEX_CB_BASE + i] = Some(index_cb(op));
        table[FD_BASE + i] = indexed::<true>(op);
        i += 1;
    }
    table
}

/// Unprefixed opcodes. Total over 0x00-0xFF.
const fn plain(op: u8) -> Handler {
    match op {
        0x00 => Z80::op_nop,
        0x08 => Z80::op_ex_af_af,
        0x10 => Z80::op_djnz,
        0x18 => Z80::op_jr_e,
        0x07 => Z80::op_rlca,
        0x0F => Z80::op_rrca,
        0x17 => Z80::op_rla,
        0x1F => Z80::op_rra,
        0x22 => Z80::op_ld_nn_hl,
        0x2A => Z80::op_ld_hl_nn_ind,
        0x32 => Z80::op_ld_nn_a,
        0x3A => Z80::op_ld_a_nn,
        0x27 => Z80::op_daa,
        0x2F => Z80::op_cpl,
        0x37 => Z80::op_scf,
        0x3F => Z80::op_ccf,
        0x76 => Z80::op_halt,
        0xC3 => Z80::op_jp_nn,
        0xC9 => Z80::op_ret,
        0xCB => Z80::op_prefix_cb,
        0xCD => Z80::op_call_nn,
        0xD3 => Z80::op_out_n_a,
        0xD9 => Z80::op_exx,
        0xDB => Z80::op_in_a_n,
        0xDD => Z80::op_prefix_index::<false>,
        0xE3 => Z80::op_ex_sp_hl,
        0xE9 => Z80::op_jp_hl,
        0xEB => Z80::op_ex_de_hl,
        0xED => Z80::op_prefix_ed,
        0xF3 => Z80::op_di,
        0xF9 => Z80::op_ld_sp_hl,
        0xFB => Z80::op_ei,
        0xFD => Z80::op_prefix_index::<true>,
        op if (op & 0xCF) == 0x01 => Z80::op_ld_rr_nn,
        op if (op & 0xEF) == 0x02 => Z80::op_ld_rp_a,
        op if (op & 0xCF) == 0x03 => Z80::op_inc_rr,
        op if (op & 0xCF) == 0x09 => Z80::op_add_hl_rr,
        op if (op & 0xEF) == 0x0A => Z80::op_ld_a_rp,
        op if (op & 0xCF) == 0x0B => Z80::op_dec_rr,
        op if (op & 0xC7) == 0x04 => Z80::op_inc_r,
        op if (op & 0xC7) == 0x05 => Z80::op_dec_r,
        op if (op & 0xC7) == 0x06 => Z80::op_ld_r_n,
        op if (op & 0xE7) == 0x20 => Z80::op_jr_cc_e,
        op if (op & 0xC0) == 0x40 => Z80::op_ld_r_r,
        op if (op & 0xC0) == 0x80 => Z80::op_alu_r,
        op if (op & 0xC7) == 0xC0 => Z80::op_ret_cc,
        op if (op & 0xCF) == 0xC1 => Z80::op_pop,
        op if (op & 0xC7) == 0xC2 => Z80::op_jp_cc_nn,
        op if (op & 0xC7) == 0xC4 => Z80::op_call_cc_nn,
        op if (op & 0xCF) == 0xC5 => Z80::op_push,
        op if (op & 0xC7) == 0xC6 => Z80::op_alu_n,
        _ => Z80::op_rst,
    }
}

/// CB-prefixed: rotates/shifts, BIT, RES, SET.
const fn cb(op: u8) -> Handler {
    match op {
        0x00..=0x3F => Z80::op_cb_rot,
        0x40..=0x7F => Z80::op_cb_bit,
        _ => Z80::op_cb_res_set,
    }
}

/// ED-prefixed. Undocumented slots alias their documented counterparts;
/// everything else is an 8 T no-op.
const fn ed(op: u8) -> Handler {
    match op {
        0x47 => Z80::op_ld_i_a,
        0x4F => Z80::op_ld_r_a,
        0x57 => Z80::op_ld_a_i,
        0x5F => Z80::op_ld_a_r,
        0x67 => Z80::op_rrd,
        0x6F => Z80::op_rld,
        0xA0 | 0xA8 => Z80::op_ldi_ldd,
        0xA1 | 0xA9 => Z80::op_cpi_cpd,
        0xA2 | 0xAA => Z80::op_ini_ind,
        0xA3 | 0xAB => Z80::op_outi_outd,
        0xB0 | 0xB8 => Z80::op_ldir_lddr,
        0xB1 | 0xB9 => Z80::op_cpir_cpdr,
        0xB2 | 0xBA => Z80::op_inir_indr,
        0xB3 | 0xBB => Z80::op_otir_otdr,
        op if (op & 0xC7) == 0x40 => Z80::op_in_r_c,
        op if (op & 0xC7) == 0x41 => Z80::op_out_c_r,
        op if (op & 0xCF) == 0x42 => Z80::op_sbc_hl_rr,
        op if (op & 0xCF) == 0x4A => Z80::op_adc_hl_rr,
        op if (op & 0xCF) == 0x43 => Z80::op_ld_nn_rr_ed,
        op if (op & 0xCF) == 0x4B => Z80::op_ld_rr_nn_ed,
        op if (op & 0xC7) == 0x44 => Z80::op_neg,
        op if (op & 0xC7) == 0x45 => Z80::op_retn,
        op if (op & 0xC7) == 0x46 => Z80::op_im,
        _ => Z80::op_ed_nop,
    }
}

/// DD/FD-prefixed. `None` means the opcode does not involve HL and runs as
/// the unprefixed instruction.
const fn indexed<const IY: bool>(op: u8) -> Option<Handler> {
    let handler: Handler = match op {
        0x21 => Z80::op_ld_index_nn::<IY>,
        0x22 => Z80::op_ld_nn_index::<IY>,
        0x23 => Z80::op_inc_index::<IY>,
        0x2A => Z80::op_ld_index_nn_ind::<IY>,
        0x2B => Z80::op_dec_index::<IY>,
        0x34 => Z80::op_inc_index_mem::<IY>,
        0x35 => Z80::op_dec_index_mem::<IY>,
        0x36 => Z80::op_ld_index_mem_n::<IY>,
        0xE1 => Z80::op_pop_index::<IY>,
        0xE3 => Z80::op_ex_sp_index::<IY>,
        0xE5 => Z80::op_push_index::<IY>,
        0xE9 => Z80::op_jp_index::<IY>,
        0xF9 => Z80::op_ld_sp_index::<IY>,
        op if (op & 0xCF) == 0x09 => Z80::op_add_index_rr::<IY>,
        op if (op & 0xF7) == 0x24 => Z80::op_inc_index_half::<IY>,
        op if (op & 0xF7) == 0x25 => Z80::op_dec_index_half::<IY>,
        op if (op & 0xF7) == 0x26 => Z80::op_ld_index_half_n::<IY>,
        0x76 => return None,
        op if (op & 0xC7) == 0x46 && op >= 0x40 && op < 0x80 => Z80::op_ld_r_index_mem::<IY>,
        op if (op & 0xF8) == 0x70 => Z80::op_ld_index_mem_r::<IY>,
        op if (op & 0xC0) == 0x40 => {
            let dst = (op >> 3) & 7;
            let src = op & 7;
            if dst == 4 || dst == 5 || src == 4 || src == 5 {
                Z80::op_ld_index_r_r::<IY>
            } else {
                return None;
            }
        }
        op if (op & 0xC7) == 0x86 => Z80::op_alu_index_mem::<IY>,
        op if (op & 0xC0) == 0x80 && ((op & 7) == 4 || (op & 7) == 5) => Z80::op_alu_index_r::<IY>,
        _ => return None,
    };
    Some(handler)
}

/// DD CB d op / FD CB d op. The displacement has already been folded into
/// `effective_addr`, so one region serves both index registers.
const fn index_cb(op: u8) -> Handler {
    match op {
        0x00..=0x3F => Z80::op_index_cb_rot,
        0x40..=0x7F => Z80::op_index_cb_bit,
        _ => Z80::op_index_cb_res_set,
    }
}

impl Z80 {
    pub(crate) fn dispatch(&mut self, bus: &mut dyn Bus, index: usize, opcode: u8) {
        let Some(handler) = OPCODES[index] else {
            unreachable!("opcode table slot {:#06x} has no handler", index);
        };
        handler(self, bus, opcode)
    }

    /// Second opcode byte after a prefix: 4 T contended fetch, R and PC advance.
    fn fetch_prefixed_opcode(&mut self, bus: &mut dyn Bus) -> u8 {
        self.contend_read(bus, self.pc, 4);
        let opcode = bus.read_byte_internal(self.tstates, self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.increment_r();
        opcode
    }

    pub(crate) fn op_prefix_cb(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let opcode = self.fetch_prefixed_opcode(bus);
        self.dispatch(bus, CB_BASE + opcode as usize, opcode);
    }

    pub(crate) fn op_prefix_ed(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let opcode = self.fetch_prefixed_opcode(bus);
        self.dispatch(bus, ED_BASE + opcode as usize, opcode);
    }

    /// DD (IX) / FD (IY) prefix.
    ///
    /// A prefix followed by another DD/FD is a 4 T no-op ending at an
    /// instruction boundary; the next prefix is fetched by the main loop.
    pub(crate) fn op_prefix_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        if matches!(bus.read(self.pc), 0xDD | 0xFD) {
            return;
        }
        let opcode = self.fetch_prefixed_opcode(bus);

        if opcode == 0xCB {
            // DD CB d op: displacement and sub-opcode are plain memory reads,
            // with two extra internal cycles before execution.
            self.contend_read(bus, self.pc, 3);
            let displacement = bus.read_byte_internal(self.tstates, self.pc) as i8;
            self.effective_addr = self.get_index::<IY>().wrapping_add(displacement as u16);
            self.pc = self.pc.wrapping_add(1);

            self.contend_read(bus, self.pc, 3);
            let opcode = bus.read_byte_internal(self.tstates, self.pc);
            self.contend_read_no_mreq_loop(bus, self.pc, 1, 2);
            self.pc = self.pc.wrapping_add(1);

            self.dispatch(bus, INDEX_CB_BASE + opcode as usize, opcode);
            return;
        }

        let base = if IY { FD_BASE } else { DD_BASE };
        match OPCODES[base + opcode as usize] {
            Some(handler) => handler(self, bus, opcode),
            None => self.dispatch(bus, opcode as usize, opcode),
        }
    }

    /// Unassigned ED opcode: the two fetches already charged are the whole cost.
    pub(crate) fn op_ed_nop(&mut self, _bus: &mut dyn Bus, _opcode: u8) {}

    pub(crate) fn op_nop(&mut self, _bus: &mut dyn Bus, _opcode: u8) {}
}
