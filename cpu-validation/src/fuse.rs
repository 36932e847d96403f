//! Reader and runner for the FUSE emulator's Z80 test suite
//! (`tests.in` / `tests.expected`).
//!
//! Each input test gives the register file, a T-state target and memory
//! blocks. The CPU is stepped until it reaches the target; the expected file
//! lists the bus events, the final registers and the memory that changed.

use std::fmt;

use z80emu_core::cpu::z80::Z80;
use z80emu_core::cpu::{CpuStateTrait, Z80State};

use crate::{EventKind, TraceEvent, TracingBus, diff_registers};

#[derive(Debug)]
pub enum FuseError {
    Syntax { line: usize, message: String },
    UnexpectedEof,
}

impl fmt::Display for FuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { line, message } => write!(f, "line {line}: {message}"),
            Self::UnexpectedEof => write!(f, "unexpected end of file"),
        }
    }
}

impl std::error::Error for FuseError {}

/// A contiguous run of bytes starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    pub address: u16,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FuseInput {
    pub name: String,
    /// Initial registers; `tstates` is always 0.
    pub state: Z80State,
    /// Execution stops at the first instruction boundary at or past this.
    pub target_tstates: u32,
    pub memory: Vec<MemoryBlock>,
}

#[derive(Debug, Clone)]
pub struct FuseExpected {
    pub name: String,
    pub events: Vec<TraceEvent>,
    pub state: Z80State,
    pub memory: Vec<MemoryBlock>,
}

// --- Parsing ---

struct Lines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    fn skip_blank(&mut self) {
        while self.pos < self.lines.len() && self.lines[self.pos].trim().is_empty() {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<&'a str, FuseError> {
        let line = self.peek().ok_or(FuseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(line)
    }

    fn error(&self, message: impl Into<String>) -> FuseError {
        FuseError::Syntax {
            line: self.pos,
            message: message.into(),
        }
    }

    fn hex(&self, token: &str) -> Result<u32, FuseError> {
        u32::from_str_radix(token, 16).map_err(|_| self.error(format!("bad hex value {token:?}")))
    }

    fn dec(&self, token: &str) -> Result<u32, FuseError> {
        token
            .parse()
            .map_err(|_| self.error(format!("bad decimal value {token:?}")))
    }
}

/// `AF BC DE HL AF' BC' DE' HL' IX IY SP PC [MEMPTR]`
fn parse_main_registers(lines: &mut Lines, state: &mut Z80State) -> Result<(), FuseError> {
    let line = lines.next()?;
    let words = line
        .split_whitespace()
        .map(|t| lines.hex(t).map(|v| v as u16))
        .collect::<Result<Vec<_>, _>>()?;
    if words.len() < 12 {
        return Err(lines.error(format!("expected 12 register words, got {}", words.len())));
    }
    let hi = |v: u16| (v >> 8) as u8;
    let lo = |v: u16| v as u8;
    (state.a, state.f) = (hi(words[0]), lo(words[0]));
    (state.b, state.c) = (hi(words[1]), lo(words[1]));
    (state.d, state.e) = (hi(words[2]), lo(words[2]));
    (state.h, state.l) = (hi(words[3]), lo(words[3]));
    (state.a_prime, state.f_prime) = (hi(words[4]), lo(words[4]));
    (state.b_prime, state.c_prime) = (hi(words[5]), lo(words[5]));
    (state.d_prime, state.e_prime) = (hi(words[6]), lo(words[6]));
    (state.h_prime, state.l_prime) = (hi(words[7]), lo(words[7]));
    state.ix = words[8];
    state.iy = words[9];
    state.sp = words[10];
    state.pc = words[11];
    Ok(())
}

/// `I R IFF1 IFF2 IM halted tstates`; returns the trailing T-state field.
fn parse_other_registers(lines: &mut Lines, state: &mut Z80State) -> Result<u32, FuseError> {
    let line = lines.next()?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 7 {
        return Err(lines.error(format!("expected 7 fields, got {}", tokens.len())));
    }
    state.i = lines.hex(tokens[0])? as u8;
    state.r = lines.hex(tokens[1])? as u8;
    state.iff1 = lines.dec(tokens[2])? != 0;
    state.iff2 = lines.dec(tokens[3])? != 0;
    state.im = lines.dec(tokens[4])? as u8;
    state.halted = lines.dec(tokens[5])? != 0;
    lines.dec(tokens[6])
}

/// `addr byte byte ... -1`
fn parse_memory_line(lines: &mut Lines) -> Result<MemoryBlock, FuseError> {
    let line = lines.next()?;
    let mut tokens = line.split_whitespace();
    let address = match tokens.next() {
        Some(t) => lines.hex(t)? as u16,
        None => return Err(lines.error("empty memory line")),
    };
    let mut bytes = Vec::new();
    for token in tokens {
        if token == "-1" {
            return Ok(MemoryBlock { address, bytes });
        }
        bytes.push(lines.hex(token)? as u8);
    }
    Err(lines.error("memory line not terminated by -1"))
}

pub fn parse_inputs(text: &str) -> Result<Vec<FuseInput>, FuseError> {
    let mut lines = Lines::new(text);
    let mut tests = Vec::new();
    loop {
        lines.skip_blank();
        if lines.at_end() {
            break;
        }
        let name = lines.next()?.trim().to_string();
        let mut state = Z80State::default();
        parse_main_registers(&mut lines, &mut state)?;
        let target_tstates = parse_other_registers(&mut lines, &mut state)?;

        let mut memory = Vec::new();
        loop {
            match lines.peek() {
                Some(l) if l.trim() == "-1" => {
                    lines.pos += 1;
                    break;
                }
                Some(_) => memory.push(parse_memory_line(&mut lines)?),
                None => return Err(FuseError::UnexpectedEof),
            }
        }

        tests.push(FuseInput {
            name,
            state,
            target_tstates,
            memory,
        });
    }
    Ok(tests)
}

fn parse_event(lines: &Lines, line: &str) -> Result<Option<TraceEvent>, FuseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(kind) = tokens.get(1).and_then(|t| EventKind::parse(t)) else {
        return Ok(None);
    };
    if tokens.len() < 3 {
        return Err(lines.error("truncated event"));
    }
    let data = match tokens.get(3) {
        Some(t) => Some(lines.hex(t)? as u8),
        None => None,
    };
    Ok(Some(TraceEvent {
        tstates: lines.dec(tokens[0])?,
        kind,
        address: lines.hex(tokens[2])? as u16,
        data,
    }))
}

pub fn parse_expected(text: &str) -> Result<Vec<FuseExpected>, FuseError> {
    let mut lines = Lines::new(text);
    let mut tests = Vec::new();
    loop {
        lines.skip_blank();
        if lines.at_end() {
            break;
        }
        let name = lines.next()?.trim().to_string();

        let mut events = Vec::new();
        while let Some(line) = lines.peek() {
            match parse_event(&lines, line)? {
                Some(event) => {
                    events.push(event);
                    lines.pos += 1;
                }
                None => break,
            }
        }

        let mut state = Z80State::default();
        parse_main_registers(&mut lines, &mut state)?;
        state.tstates = parse_other_registers(&mut lines, &mut state)?;

        let mut memory = Vec::new();
        while let Some(line) = lines.peek() {
            if line.trim().is_empty() {
                break;
            }
            memory.push(parse_memory_line(&mut lines)?);
        }

        tests.push(FuseExpected {
            name,
            events,
            state,
            memory,
        });
    }
    Ok(tests)
}

// --- Running ---

pub struct FuseRun {
    pub state: Z80State,
    pub bus: TracingBus,
    pub initial_memory: Box<[u8; 0x10000]>,
}

/// Load `input` into a fresh CPU and bus and step until the T-state target.
pub fn run(input: &FuseInput) -> FuseRun {
    let mut bus = TracingBus::new();
    for block in &input.memory {
        bus.load(block.address, &block.bytes);
    }
    let initial_memory = Box::new(bus.memory);

    let mut cpu = Z80::new();
    cpu.restore(&input.state);
    while cpu.tstates < input.target_tstates {
        cpu.step(&mut bus);
    }

    FuseRun {
        state: cpu.snapshot(),
        bus,
        initial_memory,
    }
}

/// Compare a run against the expected outcome; returns the first mismatch.
pub fn check(run: &FuseRun, expected: &FuseExpected) -> Result<(), String> {
    let name = &expected.name;

    if let Some(diff) = diff_registers(&run.state, &expected.state) {
        return Err(format!("{name}: {diff}"));
    }

    for (i, want) in expected.events.iter().enumerate() {
        match run.bus.events.get(i) {
            Some(got) if got == want => {}
            Some(got) => return Err(format!("{name}: event {i}: expected `{want}`, got `{got}`")),
            None => return Err(format!("{name}: event {i}: expected `{want}`, got nothing")),
        }
    }
    if run.bus.events.len() != expected.events.len() {
        return Err(format!(
            "{name}: {} events, expected {}",
            run.bus.events.len(),
            expected.events.len()
        ));
    }

    let mut listed = [false; 0x10000];
    for block in &expected.memory {
        for (offset, &want) in block.bytes.iter().enumerate() {
            let address = block.address.wrapping_add(offset as u16);
            listed[address as usize] = true;
            let got = run.bus.memory[address as usize];
            if got != want {
                return Err(format!(
                    "{name}: RAM[0x{address:04X}] (got 0x{got:02X} exp 0x{want:02X})"
                ));
            }
        }
    }
    for address in 0..0x10000usize {
        if run.bus.memory[address] != run.initial_memory[address] && !listed[address] {
            return Err(format!("{name}: unexpected write to 0x{address:04X}"));
        }
    }

    Ok(())
}
