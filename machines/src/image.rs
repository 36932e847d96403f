//! Program images, ROM images and 48K `.sna` snapshots.
//!
//! Images come from files or programmatic byte vectors (for testing). A CRC-32
//! can be checked against a known-good value before a ROM is mapped.

use std::path::Path;

use z80emu_core::core::machine::Machine;
use z80emu_core::cpu::Z80State;

// ---------------------------------------------------------------------------
// CRC-32 (private)
// ---------------------------------------------------------------------------

/// CRC-32 lookup table (reflected polynomial 0xEDB88320), as used by ZIP.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

fn crc32(data: &[u8]) -> u32 {
    let crc = data.iter().fold(0xFFFF_FFFFu32, |crc, &byte| {
        (crc >> 8) ^ CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize]
    });
    !crc
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading an image or snapshot.
#[derive(Debug)]
pub enum ImageError {
    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),

    /// A machine needs an image that was not supplied (e.g. its ROM).
    Missing(String),

    /// The image holds no bytes.
    Empty,

    /// The image does not fit between its load address and 0xFFFF.
    TooLarge { size: usize, load_address: u16 },

    /// The image must have an exact size (ROMs, snapshots).
    WrongSize { expected: usize, actual: usize },

    /// CRC32 checksum does not match the expected value.
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Snapshot header holds a value the CPU cannot take.
    InvalidSnapshot(String),

    /// A frame must last at least one T-state.
    ZeroFrameLength,
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Missing(what) => write!(f, "missing {what}"),
            Self::Empty => write!(f, "image is empty"),
            Self::TooLarge { size, load_address } => write!(
                f,
                "{size} bytes at 0x{load_address:04X} run past the end of the address space"
            ),
            Self::WrongSize { expected, actual } => {
                write!(f, "expected {expected} bytes, got {actual}")
            }
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "CRC32 expected 0x{expected:08X}, got 0x{actual:08X}")
            }
            Self::InvalidSnapshot(reason) => write!(f, "invalid snapshot: {reason}"),
            Self::ZeroFrameLength => write!(f, "frame length must be at least 1 T-state"),
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// A named blob of bytes destined for the Z80 address space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    pub data: Vec<u8>,
}

impl Image {
    pub fn from_file(path: &Path) -> Result<Self, ImageError> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Ok(Self { name, data })
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn crc32(&self) -> u32 {
        crc32(&self.data)
    }

    pub fn verify_crc32(&self, expected: u32) -> Result<(), ImageError> {
        let actual = self.crc32();
        if actual != expected {
            return Err(ImageError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    /// Check that the image is non-empty and ends at or before 0xFFFF when
    /// loaded at `load_address`.
    pub fn check_fits(&self, load_address: u16) -> Result<(), ImageError> {
        if self.data.is_empty() {
            return Err(ImageError::Empty);
        }
        if load_address as usize + self.data.len() > 0x10000 {
            return Err(ImageError::TooLarge {
                size: self.data.len(),
                load_address,
            });
        }
        Ok(())
    }

    pub fn require_size(&self, expected: usize) -> Result<&[u8], ImageError> {
        if self.data.len() != expected {
            return Err(ImageError::WrongSize {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(&self.data)
    }
}

// ---------------------------------------------------------------------------
// SNA snapshots
// ---------------------------------------------------------------------------

const SNA_HEADER_SIZE: usize = 27;
const SNA_RAM_SIZE: usize = 0xC000;

/// A 48K `.sna` snapshot: 27-byte register header followed by the RAM from
/// 0x4000 to 0xFFFF. PC is not in the header; it sits on the stack.
#[derive(Clone, Debug)]
pub struct SnaSnapshot {
    /// Register file with `pc` still unset and `sp` pointing at the saved PC.
    pub cpu: Z80State,
    pub border: u8,
    pub ram: Vec<u8>,
}

impl SnaSnapshot {
    pub const SIZE: usize = SNA_HEADER_SIZE + SNA_RAM_SIZE;

    pub fn parse(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() != Self::SIZE {
            return Err(ImageError::WrongSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let h = &bytes[..SNA_HEADER_SIZE];
        let word = |at: usize| u16::from_le_bytes([h[at], h[at + 1]]);

        let im = h[25];
        if im > 2 {
            return Err(ImageError::InvalidSnapshot(format!(
                "interrupt mode {im}"
            )));
        }
        let iff = h[19] & 0x04 != 0;

        let cpu = Z80State {
            i: h[0],
            l_prime: h[1],
            h_prime: h[2],
            e_prime: h[3],
            d_prime: h[4],
            c_prime: h[5],
            b_prime: h[6],
            f_prime: h[7],
            a_prime: h[8],
            l: h[9],
            h: h[10],
            e: h[11],
            d: h[12],
            c: h[13],
            b: h[14],
            iy: word(15),
            ix: word(17),
            iff1: iff,
            iff2: iff,
            r: h[20],
            f: h[21],
            a: h[22],
            sp: word(23),
            im,
            ..Z80State::default()
        };

        Ok(Self {
            cpu,
            border: h[26] & 0x07,
            ram: bytes[SNA_HEADER_SIZE..].to_vec(),
        })
    }

    /// Load the RAM into `machine`, then pop PC off the restored stack the
    /// way the RETN that ends a snapshot save would.
    pub fn apply(&self, machine: &mut dyn Machine) {
        machine.load_image(0x4000, &self.ram);

        let memory = machine.memory();
        let sp = self.cpu.sp;
        let pc = u16::from_le_bytes([
            memory[sp as usize],
            memory[sp.wrapping_add(1) as usize],
        ]);

        let state = Z80State {
            pc,
            sp: sp.wrapping_add(2),
            ..self.cpu.clone()
        };
        machine.restore_cpu_state(&state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- CRC32 ---------------------------------------------------------------

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn verify_crc32_reports_both_values() {
        let image = Image::from_bytes("rom", vec![0x00]);
        assert!(image.verify_crc32(0xD202_EF8D).is_ok());
        match image.verify_crc32(0x1234_5678) {
            Err(ImageError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, 0x1234_5678);
                assert_eq!(actual, 0xD202_EF8D);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    // -- Image ---------------------------------------------------------------

    #[test]
    fn check_fits_boundaries() {
        let image = Image::from_bytes("prog", vec![0; 0x100]);
        assert!(image.check_fits(0xFF00).is_ok(), "ends exactly at 0xFFFF");
        assert!(matches!(
            image.check_fits(0xFF01),
            Err(ImageError::TooLarge { size: 0x100, load_address: 0xFF01 })
        ));
        assert!(matches!(
            Image::from_bytes("empty", vec![]).check_fits(0),
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn require_size() {
        let image = Image::from_bytes("rom", vec![0; 0x4000]);
        assert!(image.require_size(0x4000).is_ok());
        assert!(matches!(
            image.require_size(0x2000),
            Err(ImageError::WrongSize { expected: 0x2000, actual: 0x4000 })
        ));
    }

    #[test]
    fn from_file_reads_name_and_bytes() {
        let dir = std::env::temp_dir().join("z80emu_image_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("prog.bin"), [0xC3, 0x00, 0x80]).unwrap();

        let image = Image::from_file(&dir.join("prog.bin")).unwrap();
        assert_eq!(image.name, "prog.bin");
        assert_eq!(image.data, vec![0xC3, 0x00, 0x80]);

        assert!(matches!(
            Image::from_file(&dir.join("missing.bin")),
            Err(ImageError::Io(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    // -- SNA -----------------------------------------------------------------

    fn sna_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; SnaSnapshot::SIZE];
        let header: [u8; 27] = [
            0x3F, // I
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // HL' DE' BC' AF'
            0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, // HL DE BC
            0x34, 0x12, // IY
            0x78, 0x56, // IX
            0x04, // IFF2
            0x55, // R
            0x44, // F
            0x99, // A
            0x00, 0x80, // SP
            0x01, // IM
            0x0A, // border (only the low 3 bits count)
        ];
        bytes[..27].copy_from_slice(&header);
        bytes
    }

    #[test]
    fn parse_header_fields() {
        let sna = SnaSnapshot::parse(&sna_bytes()).unwrap();
        let cpu = &sna.cpu;
        assert_eq!(cpu.i, 0x3F);
        assert_eq!((cpu.h_prime, cpu.l_prime), (0x02, 0x01));
        assert_eq!((cpu.a_prime, cpu.f_prime), (0x08, 0x07));
        assert_eq!((cpu.h, cpu.l, cpu.d, cpu.e, cpu.b, cpu.c), (0x0A, 0x09, 0x0C, 0x0B, 0x0E, 0x0D));
        assert_eq!(cpu.iy, 0x1234);
        assert_eq!(cpu.ix, 0x5678);
        assert!(cpu.iff1 && cpu.iff2);
        assert_eq!(cpu.r, 0x55);
        assert_eq!((cpu.a, cpu.f), (0x99, 0x44));
        assert_eq!(cpu.sp, 0x8000);
        assert_eq!(cpu.im, 1);
        assert_eq!(sna.border, 0x02);
        assert_eq!(sna.ram.len(), 0xC000);
    }

    #[test]
    fn parse_rejects_wrong_length_and_bad_im() {
        assert!(matches!(
            SnaSnapshot::parse(&[0; 100]),
            Err(ImageError::WrongSize { expected: 49179, actual: 100 })
        ));

        let mut bytes = sna_bytes();
        bytes[25] = 3;
        assert!(matches!(
            SnaSnapshot::parse(&bytes),
            Err(ImageError::InvalidSnapshot(_))
        ));
    }
}
