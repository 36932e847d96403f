use z80emu_core::cpu::z80::Z80;
mod common;
use common::{Access, TestBus, run_instruction, setup};

fn interrupt_cost(cpu: &mut Z80, bus: &mut TestBus) -> (bool, u32) {
    let start = cpu.tstates;
    let accepted = cpu.interrupt(bus);
    (accepted, cpu.tstates - start)
}

// ============================================================
// Acceptance
// ============================================================

#[test]
fn test_im1_interrupt() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1234;
    cpu.sp = 0x8000;
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.im = 1;

    let (accepted, cycles) = interrupt_cost(&mut cpu, &mut bus);
    assert!(accepted);
    // 7 T acknowledge plus two 3 T stack writes on the uncontended test bus.
    assert_eq!(cycles, 13);
    assert_eq!(cpu.pc, 0x0038);
    assert_eq!(cpu.sp, 0x7FFE);
    assert_eq!(&bus.memory[0x7FFE..0x8000], &[0x34, 0x12]);
    assert!(!cpu.iff1 && !cpu.iff2, "both flip-flops cleared");
    assert_eq!(cpu.r_register(), 1, "acknowledge is an M1 cycle");
    assert_eq!(
        bus.log[..2],
        [Access::Contend { addr: 0x7FFF, time: 3 }, Access::Write { addr: 0x7FFF, value: 0x12 }],
        "high byte pushed first"
    );
}

#[test]
fn test_im0_vectors_like_im1() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x8000;
    cpu.iff1 = true;
    cpu.im = 0;

    assert!(cpu.interrupt(&mut bus));
    assert_eq!(cpu.pc, 0x0038);
}

#[test]
fn test_im2_reads_vector_table() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x6000;
    cpu.sp = 0x8000;
    cpu.iff1 = true;
    cpu.im = 2;
    cpu.i = 0x90;
    bus.load(0x90FF, &[0x34, 0x12]);

    let (accepted, cycles) = interrupt_cost(&mut cpu, &mut bus);
    assert!(accepted);
    assert_eq!(cycles, 19, "7 + two pushes + two vector reads");
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(&bus.memory[0x7FFE..0x8000], &[0x00, 0x60]);
}

#[test]
fn test_interrupt_refused_when_disabled() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1234;
    cpu.sp = 0x8000;
    cpu.iff1 = false;
    cpu.iff2 = true;
    cpu.im = 1;

    let (accepted, cycles) = interrupt_cost(&mut cpu, &mut bus);
    assert!(!accepted);
    assert_eq!(cycles, 0);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.sp, 0x8000);
    assert!(bus.log.is_empty(), "no bus traffic");
}

#[test]
fn test_interrupt_leaves_halt() {
    let (mut cpu, mut bus) = setup(&[0x76]); // HALT
    cpu.sp = 0x8000;
    cpu.iff1 = true;
    cpu.im = 1;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert!(cpu.halted);
    assert_eq!(cpu.pc, 0x0000, "PC stays on the HALT opcode");

    assert!(cpu.interrupt(&mut bus));
    assert!(!cpu.halted);
    assert_eq!(&bus.memory[0x7FFE..0x8000], &[0x01, 0x00], "return address is past the HALT");
}

// ============================================================
// EI / DI
// ============================================================

#[test]
fn test_ei_delays_acceptance_by_one_instruction() {
    let (mut cpu, mut bus) = setup(&[0xFB, 0x00]); // EI ; NOP
    cpu.sp = 0x8000;
    cpu.im = 1;

    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.iff1 && cpu.iff2);
    assert!(!cpu.interrupt(&mut bus), "no interrupt directly after EI");
    assert_eq!(cpu.pc, 0x0001);

    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.interrupt(&mut bus), "accepted once the following instruction ran");
    assert_eq!(&bus.memory[0x7FFE..0x8000], &[0x02, 0x00]);
}

#[test]
fn test_ei_sequence_keeps_blocking() {
    let (mut cpu, mut bus) = setup(&[0xFB, 0xFB, 0x00]); // EI ; EI ; NOP
    cpu.sp = 0x8000;
    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert!(!cpu.interrupt(&mut bus), "each EI restarts the delay");
    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.interrupt(&mut bus));
}

#[test]
fn test_di() {
    let (mut cpu, mut bus) = setup(&[0xF3]);
    cpu.iff1 = true;
    cpu.iff2 = true;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert!(!cpu.iff1 && !cpu.iff2);
    assert!(!cpu.interrupt(&mut bus));
}

#[test]
fn test_interrupt_then_reti_round_trip() {
    // Main program: EI ; NOP ; NOP. Handler at 0x38: RETI
    let (mut cpu, mut bus) = setup(&[0xFB, 0x00, 0x00]);
    bus.load(0x0038, &[0xED, 0x4D]);
    cpu.sp = 0x8000;
    cpu.im = 1;

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.interrupt(&mut bus));
    assert_eq!(cpu.pc, 0x0038);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0002);
    assert_eq!(cpu.sp, 0x8000);
    assert!(!cpu.iff1, "IFF2 was cleared by the acknowledge, so RETI leaves interrupts off");
}

// ============================================================
// Budgeted execution while halted
// ============================================================

#[test]
fn test_halted_cpu_burns_budget() {
    let (mut cpu, mut bus) = setup(&[0x76]);
    cpu.set_budget(100);
    cpu.run_to_budget(&mut bus);

    assert!(cpu.halted);
    assert_eq!(cpu.tstates, 100, "every halted refetch costs 4 T-states");
    assert_eq!(cpu.r_register(), 25, "R advances on each refetch");
    assert_eq!(cpu.pc, 0x0000);
}

#[test]
fn test_run_to_budget_overshoots_to_instruction_boundary() {
    // LD BC, nn repeated: 10 T each
    let (mut cpu, mut bus) = setup(&[0x01, 0x00, 0x00, 0x01, 0x00, 0x00]);
    cpu.set_budget(15);
    cpu.run_to_budget(&mut bus);
    assert_eq!(cpu.tstates, 20, "the instruction that crosses the budget completes");
    assert_eq!(cpu.pc, 0x0006);
}
