//! Instruction decoding.
//!
//! [`decode`] turns a 32-bit instruction word into an [`Instruction`]. Both
//! [`crate::interpreter`] and [`crate::disassemble`] decode through this one
//! function, so they can never disagree about what a word means.

use std::fmt::{self, Display};

use crate::bits;
use crate::error::DecodeError;
use crate::registers::Register;

/// RISC-V U-format operands (`lui`, `auipc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U {
    /// Destination register.
    pub rd: Register,
    /// Upper 20 bits, already shifted into position.
    pub imm: i32,
}

/// RISC-V J-format operands (`jal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct J {
    /// Destination register (link register).
    pub rd: Register,
    /// Signed byte offset from the instruction's own address.
    pub imm: i32,
}

/// RISC-V I-format operands (`jalr`, loads, OP-IMM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I {
    /// Destination register.
    pub rd: Register,
    /// First source register (base register for loads/`jalr`).
    pub rs1: Register,
    /// 12-bit signed immediate.
    pub imm: i32,
}

/// RISC-V I-format shift operands (`slli`, `srli`, `srai`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IShift {
    /// Destination register.
    pub rd: Register,
    /// Source register.
    pub rs1: Register,
    /// Shift amount, 0..=31.
    pub shamt: u32,
}

/// RISC-V B-format operands (conditional branches).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct B {
    /// First operand register.
    pub rs1: Register,
    /// Second operand register.
    pub rs2: Register,
    /// Signed byte offset from the branch's own address.
    pub imm: i32,
}

/// RISC-V S-format operands (stores).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S {
    /// Base register.
    pub rs1: Register,
    /// Register holding the value to store.
    pub rs2: Register,
    /// 12-bit signed byte offset.
    pub imm: i32,
}

/// RISC-V R-format operands (register-register ALU ops, M extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct R {
    /// Destination register.
    pub rd: Register,
    /// First source register.
    pub rs1: Register,
    /// Second source register.
    pub rs2: Register,
}

/// A decoded RV32I + M instruction.
///
/// Only the opcodes named in this crate's documented instruction set are
/// representable; anything else is rejected by [`decode`] as a
/// [`DecodeError`] rather than folded into a catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `lui rd, imm`
    Lui(U),
    /// `auipc rd, imm`
    Auipc(U),
    /// `jal rd, imm`
    Jal(J),
    /// `jalr rd, rs1, imm`
    Jalr(I),
    /// `beq rs1, rs2, imm`
    Beq(B),
    /// `bne rs1, rs2, imm`
    Bne(B),
    /// `blt rs1, rs2, imm`
    Blt(B),
    /// `bge rs1, rs2, imm`
    Bge(B),
    /// `bltu rs1, rs2, imm`
    Bltu(B),
    /// `bgeu rs1, rs2, imm`
    Bgeu(B),
    /// `lb rd, imm(rs1)`
    Lb(I),
    /// `lh rd, imm(rs1)`
    Lh(I),
    /// `lw rd, imm(rs1)`
    Lw(I),
    /// `lbu rd, imm(rs1)`
    Lbu(I),
    /// `lhu rd, imm(rs1)`
    Lhu(I),
    /// `sb rs2, imm(rs1)`
    Sb(S),
    /// `sh rs2, imm(rs1)`
    Sh(S),
    /// `sw rs2, imm(rs1)`
    Sw(S),
    /// `addi rd, rs1, imm`
    Addi(I),
    /// `slti rd, rs1, imm`
    Slti(I),
    /// `sltiu rd, rs1, imm`
    Sltiu(I),
    /// `xori rd, rs1, imm`
    Xori(I),
    /// `ori rd, rs1, imm`
    Ori(I),
    /// `andi rd, rs1, imm`
    Andi(I),
    /// `slli rd, rs1, shamt`
    Slli(IShift),
    /// `srli rd, rs1, shamt`
    Srli(IShift),
    /// `srai rd, rs1, shamt`
    Srai(IShift),
    /// `add rd, rs1, rs2`
    Add(R),
    /// `sub rd, rs1, rs2`
    Sub(R),
    /// `sll rd, rs1, rs2`
    Sll(R),
    /// `slt rd, rs1, rs2`
    Slt(R),
    /// `sltu rd, rs1, rs2`
    Sltu(R),
    /// `xor rd, rs1, rs2`
    Xor(R),
    /// `srl rd, rs1, rs2`
    Srl(R),
    /// `sra rd, rs1, rs2`
    Sra(R),
    /// `or rd, rs1, rs2`
    Or(R),
    /// `and rd, rs1, rs2`
    And(R),
    /// `mul rd, rs1, rs2`
    Mul(R),
    /// `div rd, rs1, rs2`
    Div(R),
    /// `divu rd, rs1, rs2`
    Divu(R),
    /// `rem rd, rs1, rs2`
    Rem(R),
    /// `remu rd, rs1, rs2`
    Remu(R),
    /// `ecall`
    Ecall,
}

fn decode_r(word: u32) -> R {
    R {
        rd: Register::new(bits::rd(word)),
        rs1: Register::new(bits::rs1(word)),
        rs2: Register::new(bits::rs2(word)),
    }
}

fn decode_i(word: u32) -> I {
    I {
        rd: Register::new(bits::rd(word)),
        rs1: Register::new(bits::rs1(word)),
        imm: bits::imm_i(word),
    }
}

fn decode_s(word: u32) -> S {
    S {
        rs1: Register::new(bits::rs1(word)),
        rs2: Register::new(bits::rs2(word)),
        imm: bits::imm_s(word),
    }
}

fn decode_b(word: u32) -> B {
    B {
        rs1: Register::new(bits::rs1(word)),
        rs2: Register::new(bits::rs2(word)),
        imm: bits::imm_b(word),
    }
}

fn decode_u(word: u32) -> U {
    U {
        rd: Register::new(bits::rd(word)),
        imm: bits::imm_u(word),
    }
}

fn decode_j(word: u32) -> J {
    J {
        rd: Register::new(bits::rd(word)),
        imm: bits::imm_j(word),
    }
}

fn decode_ishift(word: u32) -> IShift {
    IShift {
        rd: Register::new(bits::rd(word)),
        rs1: Register::new(bits::rs1(word)),
        shamt: bits::shamt(word),
    }
}

/// Decode the instruction word found at `addr`.
///
/// `addr` is only used to annotate [`DecodeError`] with where decoding
/// failed; it plays no role in the decoding itself.
pub fn decode(word: u32, addr: u32) -> Result<Instruction, DecodeError> {
    let opcode = bits::opcode(word);
    let funct3 = bits::funct3(word);
    let funct7 = bits::funct7(word);

    Ok(match opcode {
        0x37 => Instruction::Lui(decode_u(word)),
        0x17 => Instruction::Auipc(decode_u(word)),
        0x6f => Instruction::Jal(decode_j(word)),
        0x67 => Instruction::Jalr(decode_i(word)),
        0x63 => match funct3 {
            0x0 => Instruction::Beq(decode_b(word)),
            0x1 => Instruction::Bne(decode_b(word)),
            0x4 => Instruction::Blt(decode_b(word)),
            0x5 => Instruction::Bge(decode_b(word)),
            0x6 => Instruction::Bltu(decode_b(word)),
            0x7 => Instruction::Bgeu(decode_b(word)),
            _ => return Err(DecodeError::UnknownFunct3 { addr, opcode, funct3 }),
        },
        0x03 => match funct3 {
            0x0 => Instruction::Lb(decode_i(word)),
            0x1 => Instruction::Lh(decode_i(word)),
            0x2 => Instruction::Lw(decode_i(word)),
            0x4 => Instruction::Lbu(decode_i(word)),
            0x5 => Instruction::Lhu(decode_i(word)),
            _ => return Err(DecodeError::UnknownFunct3 { addr, opcode, funct3 }),
        },
        0x23 => match funct3 {
            0x0 => Instruction::Sb(decode_s(word)),
            0x1 => Instruction::Sh(decode_s(word)),
            0x2 => Instruction::Sw(decode_s(word)),
            _ => return Err(DecodeError::UnknownFunct3 { addr, opcode, funct3 }),
        },
        0x13 => match funct3 {
            0x0 => Instruction::Addi(decode_i(word)),
            0x2 => Instruction::Slti(decode_i(word)),
            0x3 => Instruction::Sltiu(decode_i(word)),
            0x4 => Instruction::Xori(decode_i(word)),
            0x6 => Instruction::Ori(decode_i(word)),
            0x7 => Instruction::Andi(decode_i(word)),
            0x1 => Instruction::Slli(decode_ishift(word)),
            0x5 => match funct7 {
                0x00 => Instruction::Srli(decode_ishift(word)),
                0x20 => Instruction::Srai(decode_ishift(word)),
                _ => return Err(DecodeError::UnknownFunct7 { addr, opcode, funct3, funct7 }),
            },
            _ => return Err(DecodeError::UnknownFunct3 { addr, opcode, funct3 }),
        },
        0x33 => {
            let r = decode_r(word);
            match funct7 {
                0x00 => match funct3 {
                    0x0 => Instruction::Add(r),
                    0x1 => Instruction::Sll(r),
                    0x2 => Instruction::Slt(r),
                    0x3 => Instruction::Sltu(r),
                    0x4 => Instruction::Xor(r),
                    0x5 => Instruction::Srl(r),
                    0x6 => Instruction::Or(r),
                    0x7 => Instruction::And(r),
                    _ => unreachable!("funct3 is masked to 3 bits"),
                },
                0x20 => match funct3 {
                    0x0 => Instruction::Sub(r),
                    0x5 => Instruction::Sra(r),
                    _ => return Err(DecodeError::UnknownFunct7 { addr, opcode, funct3, funct7 }),
                },
                0x01 => match funct3 {
                    0x0 => Instruction::Mul(r),
                    0x4 => Instruction::Div(r),
                    0x5 => Instruction::Divu(r),
                    0x6 => Instruction::Rem(r),
                    0x7 => Instruction::Remu(r),
                    _ => return Err(DecodeError::UnknownFunct3 { addr, opcode, funct3 }),
                },
                _ => return Err(DecodeError::UnknownFunct7 { addr, opcode, funct3, funct7 }),
            }
        }
        0x73 => {
            let funct12 = word >> 20;
            if funct3 == 0 && funct12 == 0 {
                Instruction::Ecall
            } else {
                return Err(DecodeError::UnsupportedSystem { addr, word });
            }
        }
        _ => return Err(DecodeError::UnknownOpcode { addr, opcode }),
    })
}

impl Display for U {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, 0x{:x}", self.rd, (self.imm as u32) >> 12)
    }
}

impl Display for J {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.rd, self.imm)
    }
}

impl Display for I {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.rd, self.rs1, self.imm)
    }
}

impl Display for R {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.rd, self.rs1, self.rs2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_addi() {
        let word: u32 = 0xFFF1_0093; // addi x1, x2, -1
        match decode(word, 0).unwrap() {
            Instruction::Addi(i) => {
                assert_eq!(i.rd, Register::new(1));
                assert_eq!(i.rs1, Register::new(2));
                assert_eq!(i.imm, -1);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn decodes_mul_vs_add_by_funct7() {
        // add x1, x2, x3 : funct7=0x00, funct3=0
        let add_word = (0x00 << 25) | (3 << 20) | (2 << 15) | (0 << 12) | (1 << 7) | 0x33;
        assert!(matches!(decode(add_word, 0), Ok(Instruction::Add(_))));

        // mul x1, x2, x3 : funct7=0x01, funct3=0
        let mul_word = (0x01 << 25) | (3 << 20) | (2 << 15) | (0 << 12) | (1 << 7) | 0x33;
        assert!(matches!(decode(mul_word, 0), Ok(Instruction::Mul(_))));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let err = decode(0x0000_0000 | 0x7f, 4).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownOpcode { addr: 4, .. }));
    }

    #[test]
    fn rejects_bad_op_imm_shift_funct7() {
        // srli/srai share funct3=0x5; any funct7 other than 0x00/0x20 is invalid.
        let word = (0x10 << 25) | (0 << 20) | (1 << 15) | (0x5 << 12) | (1 << 7) | 0x13;
        assert!(matches!(decode(word, 0), Err(DecodeError::UnknownFunct7 { .. })));
    }
}
