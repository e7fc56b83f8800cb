//! Errors shared by every layer of the crate.
use alloc::string::String;

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

/// Why a descriptor record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The record did not split into position, register name and bit index.
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),
    /// The position or bit index field was not a non-negative integer.
    #[error("{field} '{token}' is not a non-negative integer")]
    BadInteger {
        field: &'static str,
        token: String,
    },
}

/// Ways a parsed chain can break the one-register-per-flip-flop invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("chain position {position} is claimed by both '{first}' and '{second}'")]
    DuplicatePosition {
        position: usize,
        first: String,
        second: String,
    },
    #[error("register '{register}' maps to position {position}, past the end of a {chain_length} flip-flop chain")]
    PositionOutOfRange {
        register: String,
        position: usize,
        chain_length: usize,
    },
    #[error("chain position {0} belongs to no register")]
    MissingPosition(usize),
    #[error("register '{register}' lists bit {bit} more than once")]
    DuplicateBit { register: String, bit: usize },
    #[error("register '{register}' has no bit {bit}")]
    MissingBit { register: String, bit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A descriptor record could not be parsed.  `line` is 1-based.
    #[error("descriptor line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },
    /// The chain described by the descriptor is inconsistent.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// A load or unload window, or a load offset, does not fit in the chain.
    #[error("window {start}..{end} does not fit in a {chain_length} flip-flop chain")]
    RangeViolation {
        start: usize,
        end: usize,
        chain_length: usize,
    },
    /// A register is too wide to be expressed as a `u64`, or a value has bits set above the
    /// register's width.
    #[error("value {value:#x} does not fit in {size}-bit register '{register}'")]
    ValueTooWide {
        register: String,
        size: usize,
        value: u64,
    },
    /// More state bits were asked for than the register has, or than can be enumerated.
    #[error("cannot enumerate {width} bits of {size}-bit register '{register}' (at most {max})")]
    WidthTooLarge {
        register: String,
        width: usize,
        size: usize,
        max: usize,
    },
    /// The named register is not part of the chain.
    #[error("no register named '{0}'")]
    UnknownRegister(String),
    /// One of the device's signal lines reported a fault.
    #[error("pin fault: {0:?}")]
    Pin(ErrorKind),
    /// The descriptor file could not be read.
    #[cfg(feature = "std")]
    #[error("reading descriptor: {0}")]
    Io(String),
}

pub(crate) fn pin_error<E: embedded_hal::digital::Error>(err: E) -> ScanError {
    ScanError::Pin(err.kind())
}
