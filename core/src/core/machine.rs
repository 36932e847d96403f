use crate::cpu::state::Z80State;

/// Machine-agnostic interface for emulated systems.
///
/// Each host machine (flat 64K, 48K contended, ...) implements this trait so
/// the frontend can drive it without knowing its memory map or port decoding.
pub trait Machine {
    /// Registry name of this machine (e.g., "flat").
    fn name(&self) -> &'static str;

    /// Length of one frame in T-states; an interrupt is attempted at the start of each.
    fn frame_tstates(&self) -> u32;

    /// Run one frame of emulation.
    fn run_frame(&mut self);

    /// Reset the machine to its initial power-on state. Memory contents survive.
    fn reset(&mut self);

    /// Copy `data` into memory starting at `address`, wrapping at 0xFFFF.
    /// Untimed, and bypasses ROM protection.
    fn load_image(&mut self, address: u16, data: &[u8]);

    fn cpu_state(&self) -> Z80State;

    fn restore_cpu_state(&mut self, state: &Z80State);

    /// Whole 64K address space as the CPU sees it.
    fn memory(&self) -> &[u8];
}
