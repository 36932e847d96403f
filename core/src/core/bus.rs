/// Memory side of the Z80 bus.
///
/// The CPU owns the T-state counter and lends it to every timed call; the
/// backend decides how many T-states an access costs (contention against a
/// video chip, wait states, etc.) and adds them. Untimed `*_internal` accessors
/// are used only where the CPU has already charged the timing separately.
pub trait MemoryAccess {
    /// Raw read with no timing side effects.
    fn read_byte_internal(&mut self, tstates: u32, address: u16) -> u8;

    /// Raw write with no timing side effects.
    fn write_byte_internal(&mut self, tstates: u32, address: u16, value: u8);

    /// Charge `time` T-states for a memory-request cycle at `address`,
    /// plus whatever contention the backend applies at the current T-state.
    fn contend_read(&mut self, tstates: &mut u32, address: u16, time: u32);

    /// Debug read: no timing, no side effects.
    fn read(&self, address: u16) -> u8;

    /// Debug write. With `protect_rom` set, backends with ROM discard writes to it.
    fn write(&mut self, address: u16, value: u8, protect_rom: bool);

    /// Whole 64K address space, for snapshot tooling.
    fn data(&self) -> &[u8; 0x10000];

    fn contend_write(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.contend_read(tstates, address, time);
    }

    /// Internal CPU cycle with `address` on the bus but no MREQ.
    fn contend_read_no_mreq(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.contend_read(tstates, address, time);
    }

    fn contend_read_no_mreq_loop(&mut self, tstates: &mut u32, address: u16, time: u32, count: u32) {
        for _ in 0..count {
            self.contend_read_no_mreq(tstates, address, time);
        }
    }

    fn contend_write_no_mreq(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.contend_read_no_mreq(tstates, address, time);
    }

    fn contend_write_no_mreq_loop(&mut self, tstates: &mut u32, address: u16, time: u32, count: u32) {
        for _ in 0..count {
            self.contend_write_no_mreq(tstates, address, time);
        }
    }

    /// Timed read: one 3 T-state memory cycle, then the data transfer.
    fn read_byte(&mut self, tstates: &mut u32, address: u16) -> u8 {
        self.contend_read(tstates, address, 3);
        self.read_byte_internal(*tstates, address)
    }

    /// Timed write: one 3 T-state memory cycle, then the data transfer.
    fn write_byte(&mut self, tstates: &mut u32, address: u16, value: u8) {
        self.contend_write(tstates, address, 3);
        self.write_byte_internal(*tstates, address, value);
    }
}

/// I/O side of the Z80 bus. Implementations perform their own pre/post-I/O
/// contention accounting around the transfer.
pub trait PortAccess {
    fn read_port(&mut self, tstates: &mut u32, port: u16) -> u8;
    fn write_port(&mut self, tstates: &mut u32, port: u16, value: u8);
}

/// Everything an instruction handler can touch.
pub trait Bus: MemoryAccess + PortAccess {}

impl<T: MemoryAccess + PortAccess + ?Sized> Bus for T {}

/// Presents separately owned memory and port backends as a single [`Bus`].
pub struct SplitBus<'a, M: ?Sized, P: ?Sized> {
    pub memory: &'a mut M,
    pub ports: &'a mut P,
}

impl<'a, M: MemoryAccess + ?Sized, P: PortAccess + ?Sized> SplitBus<'a, M, P> {
    pub fn new(memory: &'a mut M, ports: &'a mut P) -> Self {
        Self { memory, ports }
    }
}

// Every method is forwarded so that backend overrides of the provided
// methods stay in effect.
impl<M: MemoryAccess + ?Sized, P: ?Sized> MemoryAccess for SplitBus<'_, M, P> {
    fn read_byte_internal(&mut self, tstates: u32, address: u16) -> u8 {
        self.memory.read_byte_internal(tstates, address)
    }
    fn write_byte_internal(&mut self, tstates: u32, address: u16, value: u8) {
        self.memory.write_byte_internal(tstates, address, value)
    }
    fn contend_read(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.memory.contend_read(tstates, address, time)
    }
    fn read(&self, address: u16) -> u8 {
        self.memory.read(address)
    }
    fn write(&mut self, address: u16, value: u8, protect_rom: bool) {
        self.memory.write(address, value, protect_rom)
    }
    fn data(&self) -> &[u8; 0x10000] {
        self.memory.data()
    }
    fn contend_write(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.memory.contend_write(tstates, address, time)
    }
    fn contend_read_no_mreq(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.memory.contend_read_no_mreq(tstates, address, time)
    }
    fn contend_read_no_mreq_loop(&mut self, tstates: &mut u32, address: u16, time: u32, count: u32) {
        self.memory.contend_read_no_mreq_loop(tstates, address, time, count)
    }
    fn contend_write_no_mreq(&mut self, tstates: &mut u32, address: u16, time: u32) {
        self.memory.contend_write_no_mreq(tstates, address, time)
    }
    fn contend_write_no_mreq_loop(&mut self, tstates: &mut u32, address: u16, time: u32, count: u32) {
        self.memory.contend_write_no_mreq_loop(tstates, address, time, count)
    }
    fn read_byte(&mut self, tstates: &mut u32, address: u16) -> u8 {
        self.memory.read_byte(tstates, address)
    }
    fn write_byte(&mut self, tstates: &mut u32, address: u16, value: u8) {
        self.memory.write_byte(tstates, address, value)
    }
}

impl<M: ?Sized, P: PortAccess + ?Sized> PortAccess for SplitBus<'_, M, P> {
    fn read_port(&mut self, tstates: &mut u32, port: u16) -> u8 {
        self.ports.read_port(tstates, port)
    }
    fn write_port(&mut self, tstates: &mut u32, port: u16, value: u8) {
        self.ports.write_port(tstates, port, value)
    }
}
