//! Textual disassembly, sharing [`crate::instruction::decode`] with the
//! interpreter so the two can never disagree about what a word means.

use crate::instruction::{decode, Instruction};
use crate::symbols::SymbolResolver;

/// Render `addr` as `0x%08x`, or `0x%08x <name>` if `symbols` resolves it.
#[must_use]
pub fn format_addr(addr: u32, symbols: Option<&dyn SymbolResolver>) -> String {
    match symbols.and_then(|s| s.resolve(addr)) {
        Some(name) => format!("0x{addr:08x} <{name}>"),
        None => format!("0x{addr:08x}"),
    }
}

/// Disassemble the instruction word `word`, found at `addr`.
///
/// This never fails: an unrecognized word renders as `unknown 0x........`
/// rather than propagating a [`crate::error::DecodeError`].
#[must_use]
pub fn disassemble(addr: u32, word: u32, symbols: Option<&dyn SymbolResolver>) -> String {
    let Ok(instruction) = decode(word, addr) else {
        return format!("unknown 0x{word:08x}");
    };

    match instruction {
        Instruction::Lui(u) => format!("{:<7} {}, 0x{:x}", "lui", u.rd, (u.imm as u32) >> 12),
        Instruction::Auipc(u) => format!("{:<7} {}, 0x{:x}", "auipc", u.rd, (u.imm as u32) >> 12),

        Instruction::Jal(j) => {
            let target = (addr as i32).wrapping_add(j.imm) as u32;
            format!("{:<7} {}, {}", "jal", j.rd, format_addr(target, symbols))
        }
        Instruction::Jalr(i) => format!("{:<7} {}, {}({})", "jalr", i.rd, i.imm, i.rs1),

        Instruction::Beq(b) => branch_line("beq", addr, b, symbols),
        Instruction::Bne(b) => branch_line("bne", addr, b, symbols),
        Instruction::Blt(b) => branch_line("blt", addr, b, symbols),
        Instruction::Bge(b) => branch_line("bge", addr, b, symbols),
        Instruction::Bltu(b) => branch_line("bltu", addr, b, symbols),
        Instruction::Bgeu(b) => branch_line("bgeu", addr, b, symbols),

        Instruction::Lb(i) => load_line("lb", i),
        Instruction::Lh(i) => load_line("lh", i),
        Instruction::Lw(i) => load_line("lw", i),
        Instruction::Lbu(i) => load_line("lbu", i),
        Instruction::Lhu(i) => load_line("lhu", i),

        Instruction::Sb(s) => store_line("sb", s),
        Instruction::Sh(s) => store_line("sh", s),
        Instruction::Sw(s) => store_line("sw", s),

        Instruction::Addi(i) => op_imm_line("addi", i),
        Instruction::Slti(i) => op_imm_line("slti", i),
        Instruction::Sltiu(i) => op_imm_line("sltiu", i),
        Instruction::Xori(i) => op_imm_line("xori", i),
        Instruction::Ori(i) => op_imm_line("ori", i),
        Instruction::Andi(i) => op_imm_line("andi", i),

        Instruction::Slli(i) => shift_line("slli", i),
        Instruction::Srli(i) => shift_line("srli", i),
        Instruction::Srai(i) => shift_line("srai", i),

        Instruction::Add(r) => op_line("add", r),
        Instruction::Sub(r) => op_line("sub", r),
        Instruction::Sll(r) => op_line("sll", r),
        Instruction::Slt(r) => op_line("slt", r),
        Instruction::Sltu(r) => op_line("sltu", r),
        Instruction::Xor(r) => op_line("xor", r),
        Instruction::Srl(r) => op_line("srl", r),
        Instruction::Sra(r) => op_line("sra", r),
        Instruction::Or(r) => op_line("or", r),
        Instruction::And(r) => op_line("and", r),
        Instruction::Mul(r) => op_line("mul", r),
        Instruction::Div(r) => op_line("div", r),
        Instruction::Divu(r) => op_line("divu", r),
        Instruction::Rem(r) => op_line("rem", r),
        Instruction::Remu(r) => op_line("remu", r),

        Instruction::Ecall => "ecall".to_string(),
    }
}

fn branch_line(mnemonic: &str, addr: u32, b: crate::instruction::B, symbols: Option<&dyn SymbolResolver>) -> String {
    let target = (addr as i32).wrapping_add(b.imm) as u32;
    format!("{mnemonic:<7} {}, {}, {}", b.rs1, b.rs2, format_addr(target, symbols))
}

fn load_line(mnemonic: &str, i: crate::instruction::I) -> String {
    format!("{mnemonic:<7} {}, {}({})", i.rd, i.imm, i.rs1)
}

fn store_line(mnemonic: &str, s: crate::instruction::S) -> String {
    format!("{mnemonic:<7} {}, {}({})", s.rs2, s.imm, s.rs1)
}

fn op_imm_line(mnemonic: &str, i: crate::instruction::I) -> String {
    format!("{mnemonic:<7} {}, {}, {}", i.rd, i.rs1, i.imm)
}

fn shift_line(mnemonic: &str, i: crate::instruction::IShift) -> String {
    format!("{mnemonic:<7} {}, {}, {}", i.rd, i.rs1, i.shamt)
}

fn op_line(mnemonic: &str, r: crate::instruction::R) -> String {
    format!("{mnemonic:<7} {}, {}, {}", r.rd, r.rs1, r.rs2)
}
