mod common;
use common::{run_instruction, setup};

// ============================================================
// 8-bit loads
// ============================================================

#[test]
fn test_ld_r_r_all_pairs() {
    for dst in 0..8u8 {
        for src in 0..8u8 {
            if dst == 6 && src == 6 {
                continue; // HALT
            }
            let op = 0x40 | (dst << 3) | src;
            let (mut cpu, mut bus) = setup(&[op]);
            cpu.b = 0x0B;
            cpu.c = 0x0C;
            cpu.d = 0x0D;
            cpu.e = 0x0E;
            cpu.set_hl(0x4000);
            cpu.a = 0x0A;
            bus.memory[0x4000] = 0x66;

            let expected = match src {
                0 => 0x0B,
                1 => 0x0C,
                2 => 0x0D,
                3 => 0x0E,
                4 => 0x40,
                5 => 0x00,
                6 => 0x66,
                _ => 0x0A,
            };
            let cycles = run_instruction(&mut cpu, &mut bus);
            let got = if dst == 6 { bus.memory[0x4000] } else { cpu.get_reg8(dst) };
            assert_eq!(got, expected, "LD {dst}, {src} (opcode {op:#04x})");
            let want_cycles = if dst == 6 || src == 6 { 7 } else { 4 };
            assert_eq!(cycles, want_cycles, "opcode {op:#04x} timing");
        }
    }
}

#[test]
fn test_ld_r_n_and_hl_n() {
    let (mut cpu, mut bus) = setup(&[0x1E, 0x99, 0x36, 0x55]); // LD E, 0x99 ; LD (HL), 0x55
    cpu.set_hl(0x5000);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7, "LD r, n should be 7 T-states");
    assert_eq!(cpu.e, 0x99);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 10, "LD (HL), n should be 10 T-states");
    assert_eq!(bus.memory[0x5000], 0x55);
}

#[test]
fn test_ld_through_bc_de() {
    // LD (BC), A ; LD A, (DE)
    let (mut cpu, mut bus) = setup(&[0x02, 0x1A]);
    cpu.set_bc(0x5000);
    cpu.set_de(0x5001);
    cpu.a = 0x42;
    bus.memory[0x5001] = 0x24;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(bus.memory[0x5000], 0x42);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.a, 0x24);
}

#[test]
fn test_ld_absolute_a() {
    // LD (0x6000), A ; LD A, (0x6001)
    let (mut cpu, mut bus) = setup(&[0x32, 0x00, 0x60, 0x3A, 0x01, 0x60]);
    cpu.a = 0x11;
    bus.memory[0x6001] = 0x22;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 13, "LD (nn), A should be 13 T-states");
    assert_eq!(bus.memory[0x6000], 0x11);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 13, "LD A, (nn) should be 13 T-states");
    assert_eq!(cpu.a, 0x22);
}

// ============================================================
// 16-bit loads
// ============================================================

#[test]
fn test_ld_rr_nn() {
    // LD BC ; LD DE ; LD HL ; LD SP
    let (mut cpu, mut bus) = setup(&[
        0x01, 0x01, 0x10, 0x11, 0x02, 0x20, 0x21, 0x03, 0x30, 0x31, 0x04, 0x40,
    ]);
    for _ in 0..4 {
        assert_eq!(run_instruction(&mut cpu, &mut bus), 10, "LD rr, nn should be 10 T-states");
    }
    assert_eq!(cpu.get_bc(), 0x1001);
    assert_eq!(cpu.get_de(), 0x2002);
    assert_eq!(cpu.get_hl(), 0x3003);
    assert_eq!(cpu.sp, 0x4004);
}

#[test]
fn test_ld_hl_indirect_word() {
    // LD (0x6000), HL ; LD HL, (0x6002)
    let (mut cpu, mut bus) = setup(&[0x22, 0x00, 0x60, 0x2A, 0x02, 0x60]);
    cpu.set_hl(0xBEEF);
    bus.load(0x6002, &[0x78, 0x56]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 16, "LD (nn), HL should be 16 T-states");
    assert_eq!(&bus.memory[0x6000..0x6002], &[0xEF, 0xBE]);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 16, "LD HL, (nn) should be 16 T-states");
    assert_eq!(cpu.get_hl(), 0x5678);
}

#[test]
fn test_ld_word_wraps_at_top_of_memory() {
    let (mut cpu, mut bus) = setup(&[0x22, 0xFF, 0xFF]); // LD (0xFFFF), HL
    cpu.set_hl(0x1234);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.memory[0xFFFF], 0x34);
    assert_eq!(bus.memory[0x0000], 0x12, "high byte wraps to address 0");
}

#[test]
fn test_ld_sp_hl() {
    let (mut cpu, mut bus) = setup(&[0xF9]);
    cpu.set_hl(0x9000);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 6, "LD SP, HL should be 6 T-states");
    assert_eq!(cpu.sp, 0x9000);
}

// ============================================================
// Exchanges
// ============================================================

#[test]
fn test_ex_af_and_exx() {
    // EX AF, AF' ; EXX ; EX DE, HL
    let (mut cpu, mut bus) = setup(&[0x08, 0xD9, 0xEB]);
    cpu.set_af(0x1122);
    cpu.a_prime = 0x33;
    cpu.f_prime = 0x44;
    cpu.set_bc(0x0102);
    cpu.set_de(0x0304);
    cpu.set_hl(0x0506);
    cpu.b_prime = 0xB0;
    cpu.d_prime = 0xD0;
    cpu.h_prime = 0x80;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.get_af(), 0x3344);
    assert_eq!((cpu.a_prime, cpu.f_prime), (0x11, 0x22));

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.get_bc(), 0xB000);
    assert_eq!(cpu.get_de(), 0xD000);
    assert_eq!(cpu.get_hl(), 0x8000);
    assert_eq!((cpu.b_prime, cpu.c_prime), (0x01, 0x02));
    assert_eq!(cpu.get_af(), 0x3344, "EXX leaves AF alone");

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.get_de(), 0x8000);
    assert_eq!(cpu.get_hl(), 0xD000);
}

#[test]
fn test_ex_sp_hl() {
    let (mut cpu, mut bus) = setup(&[0xE3]);
    cpu.sp = 0x8000;
    cpu.set_hl(0x1234);
    bus.load(0x8000, &[0xCD, 0xAB]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 19, "EX (SP), HL should be 19 T-states");
    assert_eq!(cpu.get_hl(), 0xABCD);
    assert_eq!(&bus.memory[0x8000..0x8002], &[0x34, 0x12]);
    assert_eq!(cpu.sp, 0x8000);
    assert_eq!(bus.no_mreq_cycles(), 3);
}
