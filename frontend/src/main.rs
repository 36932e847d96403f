use std::path::PathBuf;

use clap::Parser;
use z80emu_core::cpu::Z80State;
use z80emu_machines::image::Image;
use z80emu_machines::registry::{self, MachineConfig};

mod config;
mod image_path;

#[derive(Parser, Debug)]
#[command(name = "z80emu", about = "Headless Z80 machine runner")]
struct Args {
    /// Machine to run (see --list). Defaults to "flat".
    #[arg(long)]
    machine: Option<String>,

    /// ROM image mapped at address 0.
    #[arg(long, value_name = "PATH")]
    rom: Option<PathBuf>,

    /// Program to load: a raw binary, or a ZIP whose first file is used.
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Where --image is loaded (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u16)]
    load_address: Option<u16>,

    /// Initial PC. Defaults to the load address when --image is given.
    #[arg(long, value_parser = parse_u16)]
    entry: Option<u16>,

    /// 48K .sna snapshot to restore before running.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Number of frames to run.
    #[arg(long)]
    frames: Option<u32>,

    /// Override the machine's frame length in T-states.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    frame_tstates: Option<u32>,

    /// Settings file (default: <config dir>/z80emu/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// List the available machines and exit.
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Hex dump memory after the run.
    #[arg(long, value_name = "START:LEN", value_parser = parse_dump)]
    dump: Option<(u16, usize)>,
}

fn main() {
    let args = Args::parse();

    if args.list {
        for entry in registry::all() {
            println!("{:<12} {}", entry.name, entry.description);
        }
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &args.config {
        Some(path) => config::load(path)?,
        None => config::load_default()?,
    };

    let machine_name = args
        .machine
        .or(settings.machine)
        .unwrap_or_else(|| "flat".to_string());
    let entry = registry::find(&machine_name).unwrap_or_else(|| {
        let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
        eprintln!("Unknown machine: {machine_name}");
        eprintln!("Available: {}", names.join(", "));
        std::process::exit(1);
    });

    let rom = match args.rom.or(settings.rom) {
        Some(path) => Some(image_path::load_image(&path)?),
        None => None,
    };
    let program: Option<Image> = match &args.image {
        Some(path) => Some(image_path::load_image(path)?),
        None => None,
    };
    let snapshot = match &args.snapshot {
        Some(path) => Some(image_path::load_snapshot(path)?),
        None => None,
    };

    let load_address = args.load_address.or(settings.load_address).unwrap_or(0);
    let entry_point = args.entry.or(settings.entry).or_else(|| {
        (program.is_some() && snapshot.is_none()).then_some(load_address)
    });

    let machine_config = MachineConfig {
        rom,
        program,
        load_address,
        entry: entry_point,
        snapshot,
        frame_tstates: args.frame_tstates.or(settings.frame_tstates),
    };
    let mut machine = (entry.create)(&machine_config)?;

    let frames = args.frames.or(settings.frames).unwrap_or(1);
    for _ in 0..frames {
        machine.run_frame();
    }

    println!("{} after {} frame(s)", machine.name(), frames);
    println!("{}", format_summary(&machine.cpu_state()));

    if let Some((start, len)) = args.dump {
        for line in hex_dump(machine.memory(), start, len) {
            println!("{line}");
        }
    }
    Ok(())
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn parse_dump(s: &str) -> Result<(u16, usize), String> {
    let (start, len) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:LEN, got {s:?}"))?;
    let start = parse_u16(start)?;
    let len = parse_u16(len)? as usize;
    Ok((start, len))
}

/// Flag register as `SZ5H3PNC`, with `-` for clear bits.
fn flags_string(f: u8) -> String {
    "SZ5H3PNC"
        .chars()
        .enumerate()
        .map(|(i, c)| if f & (0x80 >> i) != 0 { c } else { '-' })
        .collect()
}

fn format_summary(s: &Z80State) -> String {
    let pair = |hi: u8, lo: u8| ((hi as u16) << 8) | lo as u16;
    format!(
        "AF={:04X} BC={:04X} DE={:04X} HL={:04X} IX={:04X} IY={:04X} SP={:04X} PC={:04X}\n\
         AF'={:04X} BC'={:04X} DE'={:04X} HL'={:04X} I={:02X} R={:02X} IM={} IFF1={} IFF2={}\n\
         flags={} tstates={} halted={}",
        pair(s.a, s.f),
        pair(s.b, s.c),
        pair(s.d, s.e),
        pair(s.h, s.l),
        s.ix,
        s.iy,
        s.sp,
        s.pc,
        pair(s.a_prime, s.f_prime),
        pair(s.b_prime, s.c_prime),
        pair(s.d_prime, s.e_prime),
        pair(s.h_prime, s.l_prime),
        s.i,
        s.r,
        s.im,
        s.iff1 as u8,
        s.iff2 as u8,
        flags_string(s.f),
        s.tstates,
        s.halted,
    )
}

/// 16 bytes per line; addresses wrap at 0xFFFF.
fn hex_dump(memory: &[u8], start: u16, len: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut offset = 0;
    while offset < len {
        let address = start.wrapping_add(offset as u16);
        let count = (len - offset).min(16);
        let bytes: Vec<String> = (0..count)
            .map(|i| format!("{:02x}", memory[address.wrapping_add(i as u16) as usize]))
            .collect();
        lines.push(format!("{address:04X}: {}", bytes.join(" ")));
        offset += count;
    }
    lines
}
