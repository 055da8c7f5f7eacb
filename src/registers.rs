/*!
RV32 register file addressing.

Based on the RISC-V ABI register names from the
["RISC-V ABIs Specification"](https://github.com/riscv-non-isa/riscv-elf-psabi-doc).
*/

use std::fmt::{self, Display};

/// Number of architectural registers.
pub const NUMBER_OF_REGISTERS: usize = 32;

/// One of the 32 RV32 integer registers, addressed `x0`..`x31`.
///
/// `x0` is hard-wired to zero: [`crate::interpreter`] never writes through it,
/// it is not special-cased here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(u8);

impl Register {
    /// Build a register from its 5-bit encoding. Only the low 5 bits are used.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self((index & 0x1f) as u8)
    }

    /// The register's index, 0..=31.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// `true` for `x0`, the always-zero register.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    const fn abi_name(self) -> &'static str {
        match self.0 {
            0 => "zero",
            1 => "ra",
            2 => "sp",
            3 => "gp",
            4 => "tp",
            5 => "t0",
            6 => "t1",
            7 => "t2",
            8 => "s0",
            9 => "s1",
            10 => "a0",
            11 => "a1",
            12 => "a2",
            13 => "a3",
            14 => "a4",
            15 => "a5",
            16 => "a6",
            17 => "a7",
            18 => "s2",
            19 => "s3",
            20 => "s4",
            21 => "s5",
            22 => "s6",
            23 => "s7",
            24 => "s8",
            25 => "s9",
            26 => "s10",
            27 => "s11",
            28 => "t3",
            29 => "t4",
            30 => "t5",
            31 => "t6",
            _ => unreachable!("register index is masked to 5 bits"),
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abi_name())
    }
}

/// Hard-wired zero, ignores writes.
pub const ZERO: Register = Register(0);
/// Return address.
pub const RA: Register = Register(1);
/// Stack pointer.
pub const SP: Register = Register(2);
/// Global pointer.
pub const GP: Register = Register(3);
/// Thread pointer.
pub const TP: Register = Register(4);
/// Temporary register 0.
pub const T0: Register = Register(5);
/// Temporary register 1.
pub const T1: Register = Register(6);
/// Temporary register 2.
pub const T2: Register = Register(7);
/// Saved register 0 / frame pointer.
pub const S0: Register = Register(8);
/// Saved register 1.
pub const S1: Register = Register(9);
/// Function argument / return value 0.
pub const A0: Register = Register(10);
/// Function argument / return value 1.
pub const A1: Register = Register(11);
/// Function argument 2.
pub const A2: Register = Register(12);
/// Function argument 3.
pub const A3: Register = Register(13);
/// Function argument 4.
pub const A4: Register = Register(14);
/// Function argument 5.
pub const A5: Register = Register(15);
/// Function argument 6.
pub const A6: Register = Register(16);
/// Function argument 7, syscall number in the ecall ABI.
pub const A7: Register = Register(17);
/// Saved register 2.
pub const S2: Register = Register(18);
/// Saved register 3.
pub const S3: Register = Register(19);
/// Saved register 4.
pub const S4: Register = Register(20);
/// Saved register 5.
pub const S5: Register = Register(21);
/// Saved register 6.
pub const S6: Register = Register(22);
/// Saved register 7.
pub const S7: Register = Register(23);
/// Saved register 8.
pub const S8: Register = Register(24);
/// Saved register 9.
pub const S9: Register = Register(25);
/// Saved register 10.
pub const S10: Register = Register(26);
/// Saved register 11.
pub const S11: Register = Register(27);
/// Temporary register 3.
pub const T3: Register = Register(28);
/// Temporary register 4.
pub const T4: Register = Register(29);
/// Temporary register 5.
pub const T5: Register = Register(30);
/// Temporary register 6.
pub const T6: Register = Register(31);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_register_is_x0() {
        assert!(Register::new(0).is_zero());
        assert_eq!(Register::new(0), ZERO);
    }

    #[test]
    fn abi_names_match_convention() {
        assert_eq!(A0.to_string(), "a0");
        assert_eq!(A7.to_string(), "a7");
        assert_eq!(RA.to_string(), "ra");
        assert_eq!(T6.to_string(), "t6");
    }

    #[test]
    fn out_of_range_index_is_masked() {
        assert_eq!(Register::new(0b10_0000 | 5), T0);
    }
}
