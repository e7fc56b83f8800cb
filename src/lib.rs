//! This crate drives a scan chain: a design's flip-flops stitched into one long shift register
//! with a single serial input and a single serial output, used to set and inspect the design's
//! internal state.
//!
//! At the lowest level is the `Cable` trait, which drives the chain's control lines: clock,
//! scan-enable, scan-in and scan-out.  `cable::gpio::Gpio` implements it on top of
//! `embedded-hal` pins, so anything from a microcontroller's GPIOs to a simulator's signal
//! handles can be used.
//!
//! `layout` reads the chain descriptor, which says which named register each flip-flop belongs
//! to and which bit of that register it holds.  `ShiftProtocol` loads bit patterns into the chain
//! and unloads windows of it, counting pulses exactly, and can write and read whole registers
//! using the layout.
//!
//! On top of that, `StateSpaceExplorer` exhaustively probes a small state machine: it loads every
//! value of a state register, clocks the design once for each input value and reads the next
//! state back, building the full transition table.
//!
//! # Example
//! ```ignore
//! use scan_chain::layout::ScanChain;
//! use scan_chain::shift::{ScanConfig, ShiftProtocol};
//! let chain = ScanChain::from_file("adder/adder.log")?;
//! let config = ScanConfig::for_chain(&chain);
//! let mut cable = config.gpio(clk, scan_en, scan_in, scan_out, delay);
//! let mut shift = ShiftProtocol::from_config(&mut cable, &config);
//!
//! shift.write_registers(&[(chain.get("a_reg")?, 5), (chain.get("b_reg")?, 3)])?;
//! shift.functional_clock()?;
//! let sum = shift.read_register(chain.get("x_out")?)?;
//! ```


#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod cable;
pub mod error;
pub mod explore;
pub mod layout;
pub mod scenario;
pub mod shift;

#[cfg(test)]
pub(crate) mod sim;

pub use error::ScanError;
pub use layout::{parse, ScanChain};
