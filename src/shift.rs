//! Bit-serial load and unload on top of the `Cable` trait.  `ShiftProtocol` treats the whole
//! chain as one shift register of `chain_length` flip-flops: every pulse pushes the serial input
//! into position 0 and moves every bit one position toward `chain_length - 1`, from where it
//! leaves on the serial output.
//!
//! Bit order convention: a loaded slice is positional (`bits[i]` lands on chain position
//! `offset + i`), while `unload` returns bits in the order they leave the chain, which is the
//! highest position first.  `read_image` and `read_register` undo that so callers never deal
//! with capture order directly.
use alloc::vec;
use alloc::vec::Vec;

use embedded_hal::{delay::DelayNs, digital::{InputPin, OutputPin}};
use log::{debug, trace};

use crate::cable::gpio::{Gpio, DEFAULT_HALF_PERIOD_NS};
use crate::cable::Cable;
use crate::error::ScanError;
use crate::layout::{chain_image, Register, ScanChain};

/// Everything the protocol needs to know about the chain, derived once from the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    pub chain_length: usize,
    pub half_period_ns: u32,
}

impl ScanConfig {
    pub fn for_chain(chain: &ScanChain) -> Self {
        Self {
            chain_length: chain.chain_length(),
            half_period_ns: DEFAULT_HALF_PERIOD_NS,
        }
    }

    pub fn with_half_period(mut self, half_period_ns: u32) -> Self {
        self.half_period_ns = half_period_ns;
        self
    }

    /// Bind the scan lines to pins, clocked at this configuration's half-period
    pub fn gpio<Clk, En, Si, So, Delay>(&self, clock: Clk, scan_en: En, scan_in: Si, scan_out: So, delay: Delay) -> Gpio<Clk, En, Si, So, Delay>
        where Clk: OutputPin, En: OutputPin, Si: OutputPin, So: InputPin, Delay: DelayNs
    {
        Gpio::new(self.half_period_ns, clock, scan_en, scan_in, scan_out, delay)
    }
}

pub struct ShiftProtocol<T> {
    pub cable: T,
    chain_length: usize,
    shift_pulses: u64,
    functional_edges: u64,
}

impl<T, U> ShiftProtocol<T>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    /// Drive a chain of `chain_length` flip-flops through an existing `Cable`
    pub fn new(cable: T, chain_length: usize) -> Self {
        Self {
            cable,
            chain_length,
            shift_pulses: 0,
            functional_edges: 0,
        }
    }

    pub fn from_config(cable: T, config: &ScanConfig) -> Self {
        Self::new(cable, config.chain_length)
    }

    pub fn chain_length(&self) -> usize {
        self.chain_length
    }

    /// Number of shift pulses issued so far
    pub fn shift_pulses(&self) -> u64 {
        self.shift_pulses
    }

    /// Number of functional clock edges issued so far
    pub fn functional_edges(&self) -> u64 {
        self.functional_edges
    }

    fn check_window(&self, start: usize, len: usize) -> Result<(), ScanError> {
        match start.checked_add(len) {
            Some(end) if end <= self.chain_length => Ok(()),
            end => Err(ScanError::RangeViolation {
                start,
                end: end.unwrap_or(usize::MAX),
                chain_length: self.chain_length,
            }),
        }
    }

    fn shift(&mut self, bit: bool) -> Result<(), ScanError> {
        self.cable.set_scan_in(bit)?;
        self.cable.pulse()?;
        self.shift_pulses += 1;
        Ok(())
    }

    /// Shift `bits` into the chain so that `bits[i]` ends on chain position `offset + i`.  The
    /// bits are driven last element first, followed by `offset` zeros, for `offset + bits.len()`
    /// pulses in total.  Scan-enable is held for the whole operation and lowered again on exit,
    /// whether or not the shift succeeded.
    pub fn load(&mut self, bits: &[bool], offset: usize) -> Result<(), ScanError> {
        self.check_window(offset, bits.len())?;
        debug!("load: {} bits at offset {} ({} pulses)", bits.len(), offset, offset + bits.len());

        self.cable.set_scan_enable(true)?;
        let shifted = self.shift_in(bits, offset);
        let lowered = self.cable.set_scan_enable(false);
        shifted.and(lowered)
    }

    /// Place one bit on chain position `ff_index`, taking `ff_index + 1` pulses
    pub fn load_single(&mut self, bit: bool, ff_index: usize) -> Result<(), ScanError> {
        self.load(&[bit], ff_index)
    }

    fn shift_in(&mut self, bits: &[bool], offset: usize) -> Result<(), ScanError> {
        for &bit in bits.iter().rev() {
            self.shift(bit)?;
        }
        for _ in 0..offset {
            self.shift(false)?;
        }
        Ok(())
    }

    /// Shift the whole chain out and return the `length` bits of the window starting at chain
    /// position `start_index`, in the order they left the chain (position
    /// `start_index + length - 1` first).  Always issues exactly `chain_length` pulses, so the
    /// previous chain contents are consumed and replaced with zeros.
    pub fn unload(&mut self, start_index: usize, length: usize) -> Result<Vec<bool>, ScanError> {
        if length == 0 {
            return Err(ScanError::RangeViolation {
                start: start_index,
                end: start_index,
                chain_length: self.chain_length,
            });
        }
        self.check_window(start_index, length)?;

        // pulses before the last bit of the window reaches the output
        let shift_count = self.chain_length - (start_index + length - 1) - 1;
        debug!("unload: window {}..{} after {} shifts", start_index, start_index + length, shift_count);

        self.cable.set_scan_enable(true)?;
        let captured = self.shift_out(shift_count, length);
        let lowered = self.cable.set_scan_enable(false);
        let bits = captured?;
        lowered?;
        Ok(bits)
    }

    fn shift_out(&mut self, shift_count: usize, length: usize) -> Result<Vec<bool>, ScanError> {
        let mut bits = Vec::with_capacity(length);
        for i in 0..self.chain_length {
            self.shift(false)?;
            let sample = self.cable.scan_out()?;
            if (shift_count..shift_count + length).contains(&i) {
                trace!("unload: pulse {} captured {}", i, sample as u8);
                bits.push(sample);
            }
        }
        Ok(bits)
    }

    /// Read the single flip-flop at `ff_index`.  It leaves the chain on pulse
    /// `chain_length - ff_index - 1`.
    pub fn unload_single(&mut self, ff_index: usize) -> Result<bool, ScanError> {
        let bits = self.unload(ff_index, 1)?;
        Ok(bits[0])
    }

    /// Unload the whole chain and return it positionally: `image[p]` is the value that was in
    /// chain position `p`.
    pub fn read_image(&mut self) -> Result<Vec<bool>, ScanError> {
        let mut image = self.unload(0, self.chain_length)?;
        image.reverse();
        Ok(image)
    }

    /// Load a full chain image holding the given register values, everything else zero
    pub fn write_registers(&mut self, values: &[(&Register, u64)]) -> Result<(), ScanError> {
        let image = chain_image(self.chain_length, values)?;
        self.load(&image, 0)
    }

    /// Unload the window covering `reg` and decode its value
    pub fn read_register(&mut self, reg: &Register) -> Result<u64, ScanError> {
        let (start, len) = reg.window_in(self.chain_length)?;
        let captured = self.unload(start, len)?;

        let mut image = vec![false; self.chain_length];
        for (j, bit) in captured.into_iter().enumerate() {
            image[start + len - 1 - j] = bit;
        }
        reg.decode(&image)
    }

    /// Lower scan-enable and issue one clock pulse so the design's logic advances a state
    pub fn functional_clock(&mut self) -> Result<(), ScanError> {
        self.cable.functional_clock()?;
        self.functional_edges += 1;
        Ok(())
    }
}
