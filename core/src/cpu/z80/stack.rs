use crate::core::Bus;
use crate::cpu::z80::Z80;

impl Z80 {
    /// Push high byte then low byte (3 T + 3 T).
    pub(crate) fn push16(&mut self, bus: &mut dyn Bus, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.sp = self.sp.wrapping_sub(1);
        self.write_byte(bus, self.sp, hi);
        self.sp = self.sp.wrapping_sub(1);
        self.write_byte(bus, self.sp, lo);
    }

    /// Pop low byte then high byte (3 T + 3 T).
    pub(crate) fn pop16(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = self.read_byte(bus, self.sp);
        self.sp = self.sp.wrapping_add(1);
        let hi = self.read_byte(bus, self.sp);
        self.sp = self.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    /// PUSH qq: 11 T (qq: 0=BC, 1=DE, 2=HL, 3=AF)
    pub(crate) fn op_push(&mut self, bus: &mut dyn Bus, opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        let val = match (opcode >> 4) & 0x03 {
            3 => self.get_af(),
            rp => self.get_rp(rp),
        };
        self.push16(bus, val);
    }

    /// POP qq: 10 T
    pub(crate) fn op_pop(&mut self, bus: &mut dyn Bus, opcode: u8) {
        let val = self.pop16(bus);
        match (opcode >> 4) & 0x03 {
            3 => self.set_af(val),
            rp => self.set_rp(rp, val),
        }
    }

    /// PUSH IX: 15 T
    pub(crate) fn op_push_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        self.contend_read_no_mreq(bus, self.ir(), 1);
        self.push16(bus, self.get_index::<IY>());
    }

    /// POP IX: 14 T
    pub(crate) fn op_pop_index<const IY: bool>(&mut self, bus: &mut dyn Bus, _opcode: u8) {
        let val = self.pop16(bus);
        self.set_index::<IY>(val);
    }
}
