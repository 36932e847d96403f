use z80emu_core::cpu::z80::Z80;
mod common;
use common::{Access, TestBus, run_instruction, setup};

const C: u8 = 0x01;
const N: u8 = 0x02;
const PV: u8 = 0x04;
const H: u8 = 0x10;
const Z: u8 = 0x40;
const S: u8 = 0x80;

// ============================================================
// ADD / SUB
// ============================================================

#[test]
fn test_add_a_n_half_carry() {
    let (mut cpu, mut bus) = setup(&[0xC6, 0x01]); // ADD A, 0x01
    cpu.a = 0x0F;

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "ADD A, n should be 7 T-states");
    assert_eq!(cpu.a, 0x10);
    assert_ne!(cpu.f & H, 0, "H should be set (carry out of bit 3)");
    assert_eq!(cpu.f & C, 0, "C should be clear");
    assert_eq!(cpu.f & Z, 0, "Z should be clear");
    assert_eq!(cpu.f & N, 0, "N should be clear");
}

#[test]
fn test_add_overflow_and_carry() {
    let mut cpu = Z80::new();
    cpu.a = 0x7F;
    cpu.alu_add(0x01);
    assert_eq!(cpu.a, 0x80);
    assert_ne!(cpu.f & PV, 0, "0x7F + 1 overflows");
    assert_ne!(cpu.f & S, 0);

    cpu.a = 0xFF;
    cpu.alu_add(0x01);
    assert_eq!(cpu.a, 0x00);
    assert_ne!(cpu.f & C, 0, "0xFF + 1 carries");
    assert_ne!(cpu.f & Z, 0);
    assert_eq!(cpu.f & PV, 0, "-1 + 1 does not overflow");
}

#[test]
fn test_add_then_sub_restores_a() {
    let mut cpu = Z80::new();
    for a in 0..=255u8 {
        for b in 0..=255u8 {
            cpu.a = a;
            cpu.alu_add(b);
            let add_carry = cpu.f & C;
            let add_half = cpu.f & H;
            let sum = cpu.a;

            cpu.alu_sub(b);
            assert_eq!(cpu.a, a, "({a:#04x} + {b:#04x}) - {b:#04x}");
            assert_ne!(cpu.f & N, 0, "SUB sets N");
            // Subtracting b from (a + b) borrows exactly when the add carried.
            assert_eq!(cpu.f & C, add_carry, "carry mirror for {a:#04x} + {b:#04x}");
            assert_eq!(cpu.f & H, add_half, "half-carry mirror for {a:#04x} + {b:#04x}");
            assert_eq!(sum, a.wrapping_add(b));
        }
    }
}

#[test]
fn test_adc_sbc_use_carry() {
    let mut cpu = Z80::new();
    cpu.a = 0x10;
    cpu.f = C;
    cpu.alu_adc(0x01);
    assert_eq!(cpu.a, 0x12, "ADC adds the carry");
    assert_eq!(cpu.f & C, 0);

    cpu.a = 0x10;
    cpu.f = C;
    cpu.alu_sbc(0x01);
    assert_eq!(cpu.a, 0x0E, "SBC subtracts the carry");
    assert_ne!(cpu.f & H, 0, "borrow from bit 4");

    cpu.a = 0x00;
    cpu.f = C;
    cpu.alu_sbc(0x00);
    assert_eq!(cpu.a, 0xFF);
    assert_ne!(cpu.f & C, 0, "0 - 0 - 1 borrows");
}

#[test]
fn test_sub_overflow() {
    let mut cpu = Z80::new();
    cpu.a = 0x80;
    cpu.alu_sub(0x01);
    assert_eq!(cpu.a, 0x7F);
    assert_ne!(cpu.f & PV, 0, "-128 - 1 overflows");
    assert_eq!(cpu.f & C, 0);
}

// ============================================================
// CP
// ============================================================

#[test]
fn test_cp_leaves_a_and_takes_bits_from_operand() {
    let (mut cpu, mut bus) = setup(&[0xFE, 0x28]); // CP 0x28
    cpu.a = 0x30;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x30, "CP must not modify A");
    assert_eq!(cpu.f & 0x28, 0x28, "bits 5/3 come from the operand");
    assert_ne!(cpu.f & N, 0);
    assert_eq!(cpu.f & (Z | C), 0);
}

#[test]
fn test_cp_equal_and_less() {
    let mut cpu = Z80::new();
    cpu.a = 0x42;
    cpu.alu_cp(0x42);
    assert_ne!(cpu.f & Z, 0, "equal sets Z");
    assert_eq!(cpu.f & C, 0);

    cpu.alu_cp(0x43);
    assert_ne!(cpu.f & C, 0, "A < operand sets C");
    assert_eq!(cpu.f & Z, 0);
    assert_ne!(cpu.f & S, 0, "sign of the difference");
}

// ============================================================
// AND / OR / XOR
// ============================================================

#[test]
fn test_logic_flags() {
    let mut cpu = Z80::new();
    cpu.a = 0xF0;
    cpu.f = C | N;
    cpu.alu_and(0x0F);
    assert_eq!(cpu.a, 0x00);
    assert_eq!(cpu.f, Z | H | PV, "AND: H forced, parity of 0 is even, C and N cleared");

    cpu.a = 0x01;
    cpu.alu_or(0x02);
    assert_eq!(cpu.a, 0x03);
    assert_eq!(cpu.f, PV, "OR: two bits set is even parity");

    cpu.a = 0xFF;
    cpu.alu_xor(0x7F);
    assert_eq!(cpu.a, 0x80);
    assert_eq!(cpu.f, S, "XOR: one bit set is odd parity");
}

#[test]
fn test_alu_r_register_and_hl() {
    let (mut cpu, mut bus) = setup(&[0x80, 0x96]); // ADD A, B ; SUB (HL)
    cpu.a = 0x10;
    cpu.b = 0x05;
    cpu.set_hl(0x4000);
    bus.memory[0x4000] = 0x03;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4, "ALU A, r should be 4 T-states");
    assert_eq!(cpu.a, 0x15);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7, "ALU A, (HL) should be 7 T-states");
    assert_eq!(cpu.a, 0x12);
}

// ============================================================
// INC / DEC
// ============================================================

#[test]
fn test_inc_dec_boundaries() {
    let mut cpu = Z80::new();
    cpu.f = C;
    assert_eq!(cpu.alu_inc(0x7F), 0x80);
    assert_eq!(cpu.f & (PV | H | S | C), PV | H | S | C, "0x7F -> 0x80: overflow, half carry, carry kept");

    cpu.f = 0;
    assert_eq!(cpu.alu_dec(0x80), 0x7F);
    assert_eq!(cpu.f & (PV | H | N), PV | H | N, "0x80 -> 0x7F: overflow, half borrow");
    assert_eq!(cpu.f & C, 0, "carry kept clear");

    assert_eq!(cpu.alu_dec(0x01), 0x00);
    assert_ne!(cpu.f & Z, 0);
    assert_eq!(cpu.f & H, 0);
}

#[test]
fn test_inc_hl_indirect() {
    let (mut cpu, mut bus) = setup(&[0x34]); // INC (HL)
    cpu.set_hl(0x4000);
    bus.memory[0x4000] = 0xFF;

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "INC (HL) should be 11 T-states");
    assert_eq!(bus.memory[0x4000], 0x00);
    assert_ne!(cpu.f & Z, 0, "Z should be set");
    assert_ne!(cpu.f & H, 0, "H should be set");
    assert_eq!(cpu.f & PV, 0, "PV should be clear");

    assert_eq!(bus.memory_reads(), 2, "opcode fetch + operand read");
    assert_eq!(bus.memory_writes(), 1);
    assert_eq!(bus.no_mreq_cycles(), 1, "one internal cycle between read and write");
    assert!(
        bus.log.contains(&Access::NoMreq { addr: 0x4000, time: 1 }),
        "internal cycle is charged against HL"
    );
}

#[test]
fn test_inc_dec_rr_timing() {
    let (mut cpu, mut bus) = setup(&[0x03, 0x1B, 0x33]); // INC BC ; DEC DE ; INC SP
    cpu.set_bc(0xFFFF);
    cpu.sp = 0x1234;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6, "INC rr should be 6 T-states");
    assert_eq!(cpu.get_bc(), 0x0000);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.get_de(), 0xFFFF);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.sp, 0x1235);
    assert_eq!(cpu.f, 0, "16-bit INC/DEC leave flags alone");
}

// ============================================================
// 16-bit arithmetic
// ============================================================

#[test]
fn test_add_hl_rr() {
    let (mut cpu, mut bus) = setup(&[0x09]); // ADD HL, BC
    cpu.set_hl(0x0FFF);
    cpu.set_bc(0x0001);
    cpu.f = Z | S | PV;

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "ADD HL, rr should be 11 T-states");
    assert_eq!(cpu.get_hl(), 0x1000);
    assert_ne!(cpu.f & H, 0, "carry out of bit 11");
    assert_eq!(cpu.f & (Z | S | PV), Z | S | PV, "S, Z, PV preserved");
    assert_eq!(cpu.f & C, 0);
}

#[test]
fn test_adc_sbc_hl() {
    let (mut cpu, mut bus) = setup(&[0xED, 0x4A, 0xED, 0x52]); // ADC HL, BC ; SBC HL, DE
    cpu.set_hl(0xFFFF);
    cpu.set_bc(0x0000);
    cpu.set_de(0x0001);
    cpu.f = C;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 15, "ADC HL, rr should be 15 T-states");
    assert_eq!(cpu.get_hl(), 0x0000);
    assert_ne!(cpu.f & Z, 0, "16-bit zero");
    assert_ne!(cpu.f & C, 0);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 15, "SBC HL, rr should be 15 T-states");
    assert_eq!(cpu.get_hl(), 0xFFFE, "0 - 1 - carry");
    assert_ne!(cpu.f & (N | C | S), 0);
    assert_eq!(cpu.f & Z, 0);
}

#[test]
fn test_sbc_hl_overflow() {
    let mut cpu = Z80::new();
    cpu.set_hl(0x8000);
    cpu.f = 0;
    cpu.alu_sbc16(0x0001);
    assert_eq!(cpu.get_hl(), 0x7FFF);
    assert_ne!(cpu.f & PV, 0, "-32768 - 1 overflows");
    assert_eq!(cpu.f & S, 0);
    assert_ne!(cpu.f & H, 0, "borrow from bit 12");
}

// ============================================================
// NEG
// ============================================================

#[test]
fn test_neg() {
    let mut bus = TestBus::new();
    bus.load(0, &[0xED, 0x44]);
    let mut cpu = Z80::new();
    cpu.a = 0x01;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 8, "NEG should be 8 T-states");
    assert_eq!(cpu.a, 0xFF);
    assert_ne!(cpu.f & (C | N), 0);

    cpu.pc = 0;
    cpu.a = 0x80;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x80);
    assert_ne!(cpu.f & PV, 0, "NEG 0x80 overflows");
}
