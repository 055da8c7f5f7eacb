//! Error types.
//!
//! The simulation core itself never propagates structured errors (see
//! [`crate::interpreter`]): decode and runtime failures are logged and stop
//! the run. `SimError` covers the ambient, setup-time surface instead —
//! loading a program, reading symbols, writing a profile, parsing CLI flags —
//! where returning a `Result` all the way out to `main` is the normal thing
//! to do.

use thiserror::Error;

/// Reason a 32-bit word did not decode to a known instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The opcode field did not match any supported instruction class.
    #[error("unknown opcode 0b{opcode:07b} at 0x{addr:08x}")]
    UnknownOpcode {
        /// Address of the offending instruction.
        addr: u32,
        /// The raw 7-bit opcode field.
        opcode: u32,
    },
    /// The opcode was recognized but `funct3` (and/or `funct7`) did not
    /// select a known instruction within that class.
    #[error("unknown funct3 0x{funct3:x} for opcode 0b{opcode:07b} at 0x{addr:08x}")]
    UnknownFunct3 {
        /// Address of the offending instruction.
        addr: u32,
        /// The raw 7-bit opcode field.
        opcode: u32,
        /// The raw 3-bit funct3 field.
        funct3: u32,
    },
    /// The opcode/funct3 pair was recognized but `funct7` did not select a
    /// known variant (e.g. an OP-IMM shift, or the base/M-extension split).
    #[error("unknown funct7 0x{funct7:x} for opcode 0b{opcode:07b} funct3 0x{funct3:x} at 0x{addr:08x}")]
    UnknownFunct7 {
        /// Address of the offending instruction.
        addr: u32,
        /// The raw 7-bit opcode field.
        opcode: u32,
        /// The raw 3-bit funct3 field.
        funct3: u32,
        /// The raw 7-bit funct7 field.
        funct7: u32,
    },
    /// A SYSTEM-opcode instruction other than `ecall`.
    #[error("unsupported SYSTEM instruction 0x{word:08x} at 0x{addr:08x}")]
    UnsupportedSystem {
        /// Address of the offending instruction.
        addr: u32,
        /// The raw instruction word.
        word: u32,
    },
}

/// Ambient, setup-time error surface: loading, symbol resolution, profiling,
/// and CLI argument handling.
#[derive(Debug, Error)]
pub enum SimError {
    /// Failure reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The program image was too small to contain the headers it claimed to.
    #[error("truncated program image: expected at least {expected} bytes, got {actual}")]
    TruncatedImage {
        /// Minimum size the declared format requires.
        expected: usize,
        /// Actual size of the file on disk.
        actual: usize,
    },

    /// The ELF header was malformed in a way that prevented loading.
    #[error("malformed ELF header: {message}")]
    MalformedElf {
        /// Human-readable description of what was wrong.
        message: String,
    },

    /// `-b bimodal`/`-b gshare` was given a size that is not a power of two.
    #[error("predictor table size {size} is not a power of two")]
    InvalidPredictorSize {
        /// The rejected size.
        size: usize,
    },

    /// An unrecognized predictor name was passed to `-b`.
    #[error("unknown predictor: {name}")]
    UnknownPredictor {
        /// The rejected name.
        name: String,
    },

    /// `-b bimodal`/`-b gshare` was given without a following size.
    #[error("predictor '{name}' requires a size argument")]
    MissingPredictorSize {
        /// The predictor name that needed a size.
        name: String,
    },
}

/// Result alias for the ambient setup-time error surface.
pub type Result<T> = std::result::Result<T, SimError>;
