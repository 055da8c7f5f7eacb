//! Loading a program image into simulated memory, and marshalling the
//! simulated program's own command-line arguments.
//!
//! Full ELF parsing is out of scope (see the crate's non-goals); this reads
//! just enough of an ELF32 header to find the entry point and the first
//! loadable executable segment, and otherwise treats the file as a raw flat
//! image loaded at address zero.

use std::ops::Range;

use crate::error::SimError;
use crate::memory::{FlatMemory, Memory};

/// Address where the simulated program's `argc` is written.
pub const ARGC_ADDR: u32 = 0x0100_0000;
/// Address where the simulated program's `argv` pointer table begins.
pub const ARGV_ADDR: u32 = 0x0100_0004;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS32: u8 = 1;
const ET_EXEC_OR_DYN: [u16; 2] = [2, 3];
const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;

/// What was learned about the loaded program: where it starts running, and
/// the address range disassembly should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramInfo {
    /// Address of the first instruction to execute.
    pub entry: u32,
    /// `[start, end)` byte range containing executable code.
    pub text_range: Range<u32>,
}

/// Load `path` into a fresh [`FlatMemory`], returning the memory and what was
/// learned about the program's layout.
pub fn load_program(path: &std::path::Path) -> Result<(FlatMemory, ProgramInfo), SimError> {
    let bytes = std::fs::read(path)?;
    let mut memory = FlatMemory::default();

    if bytes.len() >= 4 && bytes[0..4] == ELF_MAGIC {
        let info = load_elf32(&bytes, &mut memory)?;
        Ok((memory, info))
    } else {
        memory.load(0, &bytes);
        let info = ProgramInfo { entry: 0, text_range: 0..bytes.len() as u32 };
        Ok((memory, info))
    }
}

fn load_elf32(bytes: &[u8], memory: &mut FlatMemory) -> Result<ProgramInfo, SimError> {
    const EHDR_SIZE: usize = 52;
    if bytes.len() < EHDR_SIZE {
        return Err(SimError::TruncatedImage { expected: EHDR_SIZE, actual: bytes.len() });
    }
    if bytes[4] != ELFCLASS32 {
        return Err(SimError::MalformedElf { message: "only ELFCLASS32 is supported".into() });
    }

    let e_type = u16::from_le_bytes([bytes[16], bytes[17]]);
    if !ET_EXEC_OR_DYN.contains(&e_type) {
        return Err(SimError::MalformedElf { message: format!("unsupported e_type {e_type}") });
    }

    let entry = u32::from_le_bytes(bytes[24..28].try_into().unwrap());
    let phoff = u32::from_le_bytes(bytes[28..32].try_into().unwrap()) as usize;
    let phentsize = u16::from_le_bytes([bytes[42], bytes[43]]) as usize;
    let phnum = u16::from_le_bytes([bytes[44], bytes[45]]) as usize;

    let mut text_range = entry..entry;
    let mut any_loaded = false;

    for i in 0..phnum {
        let base = phoff + i * phentsize;
        if base + 32 > bytes.len() {
            break;
        }
        let p_type = u32::from_le_bytes(bytes[base..base + 4].try_into().unwrap());
        if p_type != PT_LOAD {
            continue;
        }
        let p_offset = u32::from_le_bytes(bytes[base + 4..base + 8].try_into().unwrap()) as usize;
        let p_vaddr = u32::from_le_bytes(bytes[base + 8..base + 12].try_into().unwrap());
        let p_filesz = u32::from_le_bytes(bytes[base + 16..base + 20].try_into().unwrap()) as usize;
        let p_flags = u32::from_le_bytes(bytes[base + 24..base + 28].try_into().unwrap());

        let end = p_offset.saturating_add(p_filesz).min(bytes.len());
        if p_offset < bytes.len() {
            memory.load(p_vaddr, &bytes[p_offset..end]);
        }

        if p_flags & PF_X != 0 {
            text_range = p_vaddr..p_vaddr.wrapping_add(p_filesz as u32);
        }
        any_loaded = true;
    }

    if !any_loaded {
        return Err(SimError::MalformedElf { message: "no PT_LOAD segments".into() });
    }

    Ok(ProgramInfo { entry, text_range })
}

/// Write the simulated program's `argv` (its own command line, distinct from
/// the simulator's own flags) into `memory`: argument count at
/// [`ARGC_ADDR`], pointer table from [`ARGV_ADDR`], NUL-terminated argument
/// bytes packed immediately after the pointer table.
pub fn pass_args_to_program(memory: &mut impl Memory, args: &[impl AsRef<str>]) {
    memory.write_word(ARGC_ADDR, args.len() as u32);
    let mut str_addr = ARGV_ADDR + 4 * args.len() as u32;
    for (i, arg) in args.iter().enumerate() {
        memory.write_word(ARGV_ADDR + 4 * i as u32, str_addr);
        for byte in arg.as_ref().bytes() {
            memory.write_byte(str_addr, byte);
            str_addr += 1;
        }
        memory.write_byte(str_addr, 0);
        str_addr += 1;
    }
}
