use crate::core::bus::{MemoryAccess, PortAccess, SplitBus};
use crate::cpu::state::{CpuStateTrait, Z80State};
use crate::cpu::z80::Z80;

/// A Z80 bound to the memory and port backends it runs against.
///
/// The CPU never holds references into the backends; each call builds a
/// [`SplitBus`] over them for its duration.
pub struct Z80System<M, P> {
    cpu: Z80,
    memory: M,
    ports: P,
}

impl<M: MemoryAccess, P: PortAccess> Z80System<M, P> {
    pub fn new(memory: M, ports: P) -> Self {
        Self {
            cpu: Z80::new(),
            memory,
            ports,
        }
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    pub fn set_budget(&mut self, budget: u32) {
        self.cpu.set_budget(budget);
    }

    pub fn run_to_budget(&mut self) {
        let mut bus = SplitBus::new(&mut self.memory, &mut self.ports);
        self.cpu.run_to_budget(&mut bus);
    }

    /// Execute a single instruction regardless of the budget.
    pub fn step(&mut self) {
        let mut bus = SplitBus::new(&mut self.memory, &mut self.ports);
        self.cpu.step(&mut bus);
    }

    pub fn interrupt(&mut self) -> bool {
        let mut bus = SplitBus::new(&mut self.memory, &mut self.ports);
        self.cpu.interrupt(&mut bus)
    }

    /// One video frame: carry the overshoot of the previous frame, raise the
    /// frame interrupt, then run to the end of the frame.
    ///
    /// `frame_length` must be non-zero.
    pub fn run_frame(&mut self, frame_length: u32) {
        self.cpu.tstates %= frame_length;
        self.interrupt();
        self.cpu.set_budget(frame_length);
        self.run_to_budget();
    }

    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    pub fn snapshot(&self) -> Z80State {
        self.cpu.snapshot()
    }

    pub fn restore(&mut self, state: &Z80State) {
        self.cpu.restore(state);
    }
}
