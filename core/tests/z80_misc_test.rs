use z80emu_core::cpu::z80::Z80;
mod common;
use common::{run_instruction, setup};

const C: u8 = 0x01;
const N: u8 = 0x02;
const PV: u8 = 0x04;
const X: u8 = 0x08;
const H: u8 = 0x10;
const Y: u8 = 0x20;
const Z: u8 = 0x40;
const S: u8 = 0x80;

/// Decimal adjust written out from the documented truth table.
fn daa_reference(a: u8, f: u8) -> (u8, u8) {
    let (carry, half, subtract) = (f & C != 0, f & H != 0, f & N != 0);
    let low = a & 0x0F;

    let mut diff = 0u8;
    if half || low > 9 {
        diff |= 0x06;
    }
    let new_carry = carry || a > 0x99;
    if new_carry {
        diff |= 0x60;
    }

    let result = if subtract { a.wrapping_sub(diff) } else { a.wrapping_add(diff) };
    let new_half = if subtract { half && low < 6 } else { low > 9 };

    let mut flags = result & (S | Y | X);
    if result == 0 {
        flags |= Z;
    }
    if result.count_ones() % 2 == 0 {
        flags |= PV;
    }
    if new_half {
        flags |= H;
    }
    if subtract {
        flags |= N;
    }
    if new_carry {
        flags |= C;
    }
    (result, flags)
}

// ============================================================
// DAA
// ============================================================

#[test]
fn test_daa_matches_reference_for_every_input() {
    let mut cpu = Z80::new();
    for a in 0..=255u8 {
        for f in [0, C, H, C | H, N, N | C, N | H, N | C | H] {
            cpu.a = a;
            cpu.f = f;
            cpu.alu_daa();
            let (want_a, want_f) = daa_reference(a, f);
            assert_eq!(cpu.a, want_a, "DAA A for a={a:#04x} f={f:#04x}");
            assert_eq!(cpu.f, want_f, "DAA F for a={a:#04x} f={f:#04x}");
        }
    }
}

#[test]
fn test_bcd_addition_sequence() {
    // LD A, 0x19 ; ADD A, 0x28 ; DAA
    let (mut cpu, mut bus) = setup(&[0x3E, 0x19, 0xC6, 0x28, 0x27]);
    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4, "DAA should be 4 T-states");
    assert_eq!(cpu.a, 0x47, "19 + 28 = 47 in BCD");
    assert_eq!(cpu.f & C, 0);
}

#[test]
fn test_bcd_subtraction_borrow() {
    // LD A, 0x10 ; SUB 0x25 ; DAA
    let (mut cpu, mut bus) = setup(&[0x3E, 0x10, 0xD6, 0x25, 0x27]);
    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.a, 0x85, "10 - 25 = -15, i.e. 85 with borrow");
    assert_ne!(cpu.f & C, 0);
    assert_ne!(cpu.f & N, 0);
}

// ============================================================
// CPL / SCF / CCF
// ============================================================

#[test]
fn test_cpl() {
    let (mut cpu, mut bus) = setup(&[0x2F]);
    cpu.a = 0x5A;
    cpu.f = C | Z | S | PV;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.a, 0xA5);
    assert_eq!(cpu.f, C | Z | S | PV | H | N | Y, "bits 5/3 from the new A");
}

#[test]
fn test_scf_ccf() {
    // SCF ; CCF ; CCF
    let (mut cpu, mut bus) = setup(&[0x37, 0x3F, 0x3F]);
    cpu.a = 0x28;
    cpu.f = Z | H | N;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.f, Z | C | X | Y, "SCF clears H and N");

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.f, Z | H | X | Y, "CCF moves the old carry into H");

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.f, Z | C | X | Y);
}

// ============================================================
// Accumulator rotates
// ============================================================

#[test]
fn test_accumulator_rotates_keep_szpv() {
    // RLCA ; RRCA ; RLA ; RRA
    let (mut cpu, mut bus) = setup(&[0x07, 0x0F, 0x17, 0x1F]);
    cpu.a = 0x81;
    cpu.f = S | Z | PV | H | N;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.a, 0x03);
    assert_eq!(cpu.f, S | Z | PV | C, "RLCA clears H and N, keeps S Z PV");

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x81);
    assert_eq!(cpu.f, S | Z | PV | C);

    // RLA: carry in at bit 0, bit 7 out
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x03);
    assert_eq!(cpu.f & C, C);

    // RRA: carry in at bit 7, bit 0 out
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x81);
    assert_eq!(cpu.f & C, C);
}

#[test]
fn test_rla_without_carry() {
    let (mut cpu, mut bus) = setup(&[0x17]);
    cpu.a = 0x40;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x80);
    assert_eq!(cpu.f & C, 0);
}

// ============================================================
// NOP / HALT
// ============================================================

#[test]
fn test_nop() {
    let (mut cpu, mut bus) = setup(&[0x00]);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.pc, 1);
    assert_eq!(cpu.r_register(), 1);
}

#[test]
fn test_halt_refetches() {
    let (mut cpu, mut bus) = setup(&[0x76]);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert!(cpu.halted);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4, "halted step costs one refetch");
    assert_eq!(cpu.pc, 0);
    assert_eq!(cpu.r_register(), 2);
}
