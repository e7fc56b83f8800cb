//! Signal-level access to the device under test.  Anything that can drive the scan chain's
//! control lines should implement the `Cable` trait; `gpio::Gpio` does so on top of
//! `embedded-hal` pins.
pub mod gpio;

use crate::error::ScanError;

pub trait Cable {
    /// Drive the scan-enable line.  While it is high every clock pulse shifts the chain by one
    /// position; while it is low a pulse is a functional clock edge for the design.
    fn set_scan_enable(&mut self, enable: bool) -> Result<(), ScanError>;
    /// Drive the serial input.  The value is captured into chain position 0 on the next pulse.
    fn set_scan_in(&mut self, bit: bool) -> Result<(), ScanError>;
    /// One full clock period: clock high, wait half a period, clock low, wait half a period.
    fn pulse(&mut self) -> Result<(), ScanError>;
    /// Sample the serial output, which holds the bit that left the end of the chain on the most
    /// recent pulse.
    fn scan_out(&mut self) -> Result<bool, ScanError>;

    /// Lower scan-enable and issue one pulse, letting the design's own sequential logic advance
    /// by one state.
    fn functional_clock(&mut self) -> Result<(), ScanError> {
        self.set_scan_enable(false)?;
        self.pulse()
    }
}
