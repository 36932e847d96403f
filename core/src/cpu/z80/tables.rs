//! Flag lookup tables, built at compile time.
//!
//! The half-carry and overflow tables are indexed by a 3-bit hash of one bit
//! from each operand and from the result:
//! `((a & 0x88) >> 3) | ((value & 0x88) >> 2) | ((result & 0x88) >> 1)`.
//! The low three bits of that hash index the half-carry tables (bit 3s), the
//! high three bits (`>> 4`) index the overflow tables (bit 7s).

use super::Flag;

const H: u8 = Flag::H as u8;
const PV: u8 = Flag::PV as u8;
const X: u8 = Flag::X as u8;
const Y: u8 = Flag::Y as u8;
const Z: u8 = Flag::Z as u8;
const S: u8 = Flag::S as u8;

pub(crate) const HALFCARRY_ADD: [u8; 8] = [0, H, H, H, 0, 0, 0, H];
pub(crate) const HALFCARRY_SUB: [u8; 8] = [0, 0, H, 0, H, 0, H, H];
pub(crate) const OVERFLOW_ADD: [u8; 8] = [0, 0, 0, PV, PV, 0, 0, 0];
pub(crate) const OVERFLOW_SUB: [u8; 8] = [0, PV, 0, 0, 0, 0, PV, 0];

/// S, Z, bit 5 and bit 3 of the byte.
pub static SZ53: [u8; 256] = build_sz53();

/// PV set when the byte has an even number of set bits.
pub static PARITY: [u8; 256] = build_parity();

/// [`SZ53`] combined with [`PARITY`].
pub static SZ53P: [u8; 256] = build_sz53p();

const fn build_sz53() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let v = i as u8;
        table[i] = v & (S | X | Y);
        i += 1;
    }
    table[0] |= Z;
    table
}

const fn build_parity() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let v = i as u8;
        if v.count_ones() % 2 == 0 {
            table[i] = PV;
        }
        i += 1;
    }
    table
}

const fn build_sz53p() -> [u8; 256] {
    let sz53 = build_sz53();
    let parity = build_parity();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = sz53[i] | parity[i];
        i += 1;
    }
    table
}

/// Half-carry/overflow hash for an 8-bit operation.
#[inline]
pub(crate) fn lookup8(a: u8, value: u8, result: u8) -> usize {
    (((a & 0x88) >> 3) | ((value & 0x88) >> 2) | ((result & 0x88) >> 1)) as usize
}

/// Half-carry/overflow hash for a 16-bit operation, on bits 11 and 15.
#[inline]
pub(crate) fn lookup16(a: u16, value: u16, result: u32) -> usize {
    (((a & 0x8800) >> 11) | ((value & 0x8800) >> 10) | ((result as u16 & 0x8800) >> 9)) as usize
}
