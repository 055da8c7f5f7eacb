//! The fetch-decode-execute loop.

use tracing::error;

use crate::instruction::{decode, Instruction};
use crate::memory::Memory;
use crate::predictor::{BranchStats, Outcome, Predictor};
use crate::registers::{Register, NUMBER_OF_REGISTERS};

/// a7 value that requests a single character from standard input.
const ECALL_GETCHAR: i32 = 1;
/// a7 value that writes a single character to standard output.
const ECALL_PUTCHAR: i32 = 2;
/// a7 values that terminate the simulated program (Linux-style and raw exit).
const ECALL_EXIT: [i32; 2] = [3, 93];

/// How an [`Interpreter`] should read standard input and write standard
/// output for `ecall` 1/2. A trait so tests can substitute in-memory I/O.
pub trait Console {
    /// Read one byte, or `None` on end of input.
    fn read_byte(&mut self) -> Option<u8>;
    /// Write one byte.
    fn write_byte(&mut self, byte: u8);
}

/// [`Console`] backed by the process's real stdin/stdout.
#[derive(Debug, Default)]
pub struct StdioConsole;

impl Console for StdioConsole {
    fn read_byte(&mut self) -> Option<u8> {
        use std::io::Read;
        let mut buf = [0u8; 1];
        match std::io::stdin().read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }

    fn write_byte(&mut self, byte: u8) {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }
}

/// The 32 integer registers and the program counter.
#[derive(Debug, Clone)]
struct RegisterFile {
    regs: [i32; NUMBER_OF_REGISTERS],
}

impl RegisterFile {
    fn new() -> Self {
        Self { regs: [0; NUMBER_OF_REGISTERS] }
    }

    fn read(&self, r: Register) -> i32 {
        self.regs[r.index() as usize]
    }

    /// Writes to `x0` are silently dropped.
    fn write(&mut self, r: Register, value: i32) {
        if !r.is_zero() {
            self.regs[r.index() as usize] = value;
        }
    }
}

/// Outcome of running a program to completion or to a logged halt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Number of instructions retired before the run stopped.
    pub instructions_retired: u64,
}

/// Runs a program starting at `entry` until it exits or hits an
/// unrecoverable decode/runtime error.
///
/// Decode and execution failures are not propagated as `Result`s (see
/// [`crate::error::DecodeError`]'s module documentation): they are logged
/// through `tracing::error!` and stop the run, returning whatever was
/// retired so far. This mirrors how a physical core reports a trap to
/// firmware rather than unwinding the caller.
pub fn simulate<M: Memory>(
    memory: &mut M,
    entry: u32,
    mut predictor: Option<&mut dyn Predictor>,
    stats: &mut BranchStats,
    console: &mut dyn Console,
) -> RunReport {
    let mut regs = RegisterFile::new();
    let mut pc = entry;
    let mut instructions_retired = 0u64;
    let mut running = true;

    while running {
        let addr = pc;
        let word = memory.read_word(addr);
        pc = pc.wrapping_add(4);
        instructions_retired += 1;

        let instruction = match decode(word, addr) {
            Ok(instruction) => instruction,
            Err(e) => {
                error!("{e}");
                break;
            }
        };

        match instruction {
            Instruction::Lui(u) => regs.write(u.rd, u.imm),
            Instruction::Auipc(u) => regs.write(u.rd, (addr as i32).wrapping_add(u.imm)),

            Instruction::Jal(j) => {
                regs.write(j.rd, (addr as i32).wrapping_add(4));
                pc = (addr as i32).wrapping_add(j.imm) as u32;
            }
            Instruction::Jalr(i) => {
                let target = (regs.read(i.rs1).wrapping_add(i.imm)) & !1;
                regs.write(i.rd, (addr as i32).wrapping_add(4));
                pc = target as u32;
            }

            Instruction::Beq(b) => pc = resolve_branch(predictor.as_deref_mut(), stats, addr, &regs, b, |a, c| a == c),
            Instruction::Bne(b) => pc = resolve_branch(predictor.as_deref_mut(), stats, addr, &regs, b, |a, c| a != c),
            Instruction::Blt(b) => pc = resolve_branch(predictor.as_deref_mut(), stats, addr, &regs, b, |a, c| a < c),
            Instruction::Bge(b) => pc = resolve_branch(predictor.as_deref_mut(), stats, addr, &regs, b, |a, c| a >= c),
            Instruction::Bltu(b) => pc = resolve_branch(predictor.as_deref_mut(), stats, addr, &regs, b, |a, c| (a as u32) < (c as u32)),
            Instruction::Bgeu(b) => pc = resolve_branch(predictor.as_deref_mut(), stats, addr, &regs, b, |a, c| (a as u32) >= (c as u32)),

            Instruction::Lb(i) => {
                let eff = regs.read(i.rs1).wrapping_add(i.imm) as u32;
                let value = memory.read_byte(eff) as i8 as i32;
                regs.write(i.rd, value);
            }
            Instruction::Lbu(i) => {
                let eff = regs.read(i.rs1).wrapping_add(i.imm) as u32;
                regs.write(i.rd, memory.read_byte(eff) as i32);
            }
            Instruction::Lh(i) => {
                let eff = regs.read(i.rs1).wrapping_add(i.imm) as u32;
                let value = memory.read_half(eff) as i16 as i32;
                regs.write(i.rd, value);
            }
            Instruction::Lhu(i) => {
                let eff = regs.read(i.rs1).wrapping_add(i.imm) as u32;
                regs.write(i.rd, memory.read_half(eff) as i32);
            }
            Instruction::Lw(i) => {
                let eff = regs.read(i.rs1).wrapping_add(i.imm) as u32;
                regs.write(i.rd, memory.read_word(eff) as i32);
            }

            Instruction::Sb(s) => {
                let eff = regs.read(s.rs1).wrapping_add(s.imm) as u32;
                memory.write_byte(eff, regs.read(s.rs2) as u8);
            }
            Instruction::Sh(s) => {
                let eff = regs.read(s.rs1).wrapping_add(s.imm) as u32;
                memory.write_half(eff, regs.read(s.rs2) as u16);
            }
            Instruction::Sw(s) => {
                let eff = regs.read(s.rs1).wrapping_add(s.imm) as u32;
                memory.write_word(eff, regs.read(s.rs2) as u32);
            }

            Instruction::Addi(i) => regs.write(i.rd, regs.read(i.rs1).wrapping_add(i.imm)),
            Instruction::Slti(i) => regs.write(i.rd, i32::from(regs.read(i.rs1) < i.imm)),
            Instruction::Sltiu(i) => regs.write(i.rd, i32::from((regs.read(i.rs1) as u32) < (i.imm as u32))),
            Instruction::Xori(i) => regs.write(i.rd, regs.read(i.rs1) ^ i.imm),
            Instruction::Ori(i) => regs.write(i.rd, regs.read(i.rs1) | i.imm),
            Instruction::Andi(i) => regs.write(i.rd, regs.read(i.rs1) & i.imm),
            Instruction::Slli(i) => regs.write(i.rd, ((regs.read(i.rs1) as u32) << i.shamt) as i32),
            Instruction::Srli(i) => regs.write(i.rd, ((regs.read(i.rs1) as u32) >> i.shamt) as i32),
            Instruction::Srai(i) => regs.write(i.rd, regs.read(i.rs1) >> i.shamt),

            Instruction::Add(r) => regs.write(r.rd, regs.read(r.rs1).wrapping_add(regs.read(r.rs2))),
            Instruction::Sub(r) => regs.write(r.rd, regs.read(r.rs1).wrapping_sub(regs.read(r.rs2))),
            Instruction::Sll(r) => regs.write(r.rd, ((regs.read(r.rs1) as u32) << (regs.read(r.rs2) & 0x1f)) as i32),
            Instruction::Slt(r) => regs.write(r.rd, i32::from(regs.read(r.rs1) < regs.read(r.rs2))),
            Instruction::Sltu(r) => regs.write(r.rd, i32::from((regs.read(r.rs1) as u32) < (regs.read(r.rs2) as u32))),
            Instruction::Xor(r) => regs.write(r.rd, regs.read(r.rs1) ^ regs.read(r.rs2)),
            Instruction::Srl(r) => regs.write(r.rd, ((regs.read(r.rs1) as u32) >> (regs.read(r.rs2) & 0x1f)) as i32),
            Instruction::Sra(r) => regs.write(r.rd, regs.read(r.rs1) >> (regs.read(r.rs2) & 0x1f)),
            Instruction::Or(r) => regs.write(r.rd, regs.read(r.rs1) | regs.read(r.rs2)),
            Instruction::And(r) => regs.write(r.rd, regs.read(r.rs1) & regs.read(r.rs2)),

            Instruction::Mul(r) => regs.write(r.rd, regs.read(r.rs1).wrapping_mul(regs.read(r.rs2))),
            Instruction::Div(r) => {
                let (s1, s2) = (regs.read(r.rs1), regs.read(r.rs2));
                let result = if s2 == 0 {
                    -1
                } else if s1 == i32::MIN && s2 == -1 {
                    i32::MIN
                } else {
                    s1 / s2
                };
                regs.write(r.rd, result);
            }
            Instruction::Divu(r) => {
                let (u1, u2) = (regs.read(r.rs1) as u32, regs.read(r.rs2) as u32);
                let result = if u2 == 0 { u32::MAX } else { u1 / u2 };
                regs.write(r.rd, result as i32);
            }
            Instruction::Rem(r) => {
                let (s1, s2) = (regs.read(r.rs1), regs.read(r.rs2));
                let result = if s2 == 0 {
                    s1
                } else if s1 == i32::MIN && s2 == -1 {
                    0
                } else {
                    s1 % s2
                };
                regs.write(r.rd, result);
            }
            Instruction::Remu(r) => {
                let (u1, u2) = (regs.read(r.rs1) as u32, regs.read(r.rs2) as u32);
                let result = if u2 == 0 { u1 } else { u1 % u2 };
                regs.write(r.rd, result as i32);
            }

            Instruction::Ecall => {
                running = handle_ecall(&mut regs, console);
            }
        }
    }

    RunReport { instructions_retired }
}

/// Resolve one conditional branch: query the predictor (if any) before the
/// outcome is known, evaluate `condition`, record the prediction's accuracy,
/// then tell the predictor the real outcome. Returns the next PC.
fn resolve_branch(
    predictor: Option<&mut dyn Predictor>,
    stats: &mut BranchStats,
    addr: u32,
    regs: &RegisterFile,
    b: crate::instruction::B,
    condition: impl Fn(i32, i32) -> bool,
) -> u32 {
    let target = (addr as i32).wrapping_add(b.imm) as u32;
    let actual = Outcome::from_bool(condition(regs.read(b.rs1), regs.read(b.rs2)));

    if let Some(predictor) = predictor {
        let predicted = predictor.predict(addr, target);
        stats.record(predicted, actual);
        predictor.update(addr, target, actual);
    }

    if actual.is_taken() {
        target
    } else {
        addr.wrapping_add(4)
    }
}

fn handle_ecall(regs: &mut RegisterFile, console: &mut dyn Console) -> bool {
    let call = regs.read(Register::new(17)); // a7
    if call == ECALL_GETCHAR {
        let ch = console.read_byte().map_or(-1, i32::from);
        regs.write(Register::new(10), ch); // a0
        true
    } else if call == ECALL_PUTCHAR {
        let ch = regs.read(Register::new(10)) as u8;
        console.write_byte(ch);
        true
    } else if ECALL_EXIT.contains(&call) {
        false
    } else {
        error!("unknown ecall: {call}");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;
    use crate::predictor::NeverTaken;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeConsole {
        input: VecDeque<u8>,
        output: Vec<u8>,
    }

    impl Console for FakeConsole {
        fn read_byte(&mut self) -> Option<u8> {
            self.input.pop_front()
        }

        fn write_byte(&mut self, byte: u8) {
            self.output.push(byte);
        }
    }

    fn load(mem: &mut FlatMemory, words: &[u32]) {
        for (i, &word) in words.iter().enumerate() {
            mem.write_word(i as u32 * 4, word);
        }
    }

    #[test]
    fn x0_writes_are_dropped() {
        let mut regs = RegisterFile::new();
        regs.write(Register::new(0), 42);
        assert_eq!(regs.read(Register::new(0)), 0);
    }

    #[test]
    fn additive_chain_retires_to_exit() {
        let mut mem = FlatMemory::default();
        load(
            &mut mem,
            &[
                0x0050_0093, // addi x1, x0, 5
                0x0070_0113, // addi x2, x0, 7
                0x0020_81B3, // add  x3, x1, x2
                0x05D0_0893, // addi x17, x0, 93
                0x0000_0073, // ecall (exit)
            ],
        );
        let mut stats = BranchStats::default();
        let mut console = FakeConsole::default();
        let report = simulate(&mut mem, 0, None, &mut stats, &mut console);
        assert_eq!(report.instructions_retired, 5);
    }

    #[test]
    fn div_rem_handle_int_min_over_minus_one() {
        let mut mem = FlatMemory::default();
        load(
            &mut mem,
            &[
                0x8000_00B7, // lui  x1, 0x80000        -> x1 = INT32_MIN
                0xFFF0_0113, // addi x2, x0, -1
                0x0220_C1B3, // div  x3, x1, x2
                0x0220_E233, // rem  x4, x1, x2
                0x7E30_2823, // sw   x3, 2032(x0)
                0x7E40_2A23, // sw   x4, 2036(x0)
                0x05D0_0893, // addi x17, x0, 93
                0x0000_0073, // ecall
            ],
        );
        let mut stats = BranchStats::default();
        let mut console = FakeConsole::default();
        let report = simulate(&mut mem, 0, None, &mut stats, &mut console);
        assert_eq!(report.instructions_retired, 8);
        assert_eq!(mem.read_word(2032) as i32, i32::MIN); // div
        assert_eq!(mem.read_word(2036) as i32, 0); // rem
    }

    #[test]
    fn division_by_zero_follows_risc_v_convention() {
        // div x3, x1, x2 with x2 == 0 must yield -1, not a trap.
        let mut mem = FlatMemory::default();
        load(
            &mut mem,
            &[
                0x0050_0093, // addi x1, x0, 5
                0x0000_0113, // addi x2, x0, 0
                0x0220_C1B3, // div  x3, x1, x2
                0x05D0_0893, // addi x17, x0, 93
                0x0000_0073, // ecall
            ],
        );
        let mut stats = BranchStats::default();
        let mut console = FakeConsole::default();
        let report = simulate(&mut mem, 0, None, &mut stats, &mut console);
        assert_eq!(report.instructions_retired, 5);
    }

    #[test]
    fn backward_loop_drives_predictor_stats() {
        let mut mem = FlatMemory::default();
        load(
            &mut mem,
            &[
                0x0030_0093, // addi x1, x0, 3
                0xFFF0_8093, // addi x1, x1, -1      (loop:)
                0xFE00_9EE3, // bne  x1, x0, loop
                0x05D0_0893, // addi x17, x0, 93
                0x0000_0073, // ecall
            ],
        );
        let mut stats = BranchStats::default();
        let mut predictor = NeverTaken;
        let mut console = FakeConsole::default();
        let report = simulate(&mut mem, 0, Some(&mut predictor), &mut stats, &mut console);
        assert_eq!(stats.total_branches, 3);
        assert_eq!(stats.mispredictions, 2);
        assert_eq!(report.instructions_retired, 9);
    }

    #[test]
    fn ecall_putchar_writes_to_console() {
        let mut mem = FlatMemory::default();
        load(
            &mut mem,
            &[
                0x0410_0093, // addi x1, x0, 'A' (0x41)
                0x0000_8533, // add  x10, x1, x0   (a0 = x1)
                0x0020_0893, // addi x17, x0, 2    (a7 = putchar)
                0x0000_0073, // ecall
                0x05D0_0893, // addi x17, x0, 93
                0x0000_0073, // ecall (exit)
            ],
        );
        let mut stats = BranchStats::default();
        let mut console = FakeConsole::default();
        simulate(&mut mem, 0, None, &mut stats, &mut console);
        assert_eq!(console.output, vec![b'A']);
    }
}
