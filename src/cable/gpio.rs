use embedded_hal::{delay::DelayNs, digital::{InputPin, OutputPin, PinState}};
use log::trace;

use crate::cable::Cable;
use crate::error::{pin_error, ScanError};

/// Half of the nominal 20ns clock period
pub const DEFAULT_HALF_PERIOD_NS: u32 = 10;

pub struct Gpio<Clk, En, Si, So, Delay> where Clk: OutputPin, En: OutputPin, Si: OutputPin, So: InputPin, Delay: DelayNs {
    half_period: u32,
    delay: Delay,
    clock: Clk,
    scan_en: En,
    scan_in: Si,
    scan_out: So,
}

impl<Clk, En, Si, So, Delay> Gpio<Clk, En, Si, So, Delay> where Clk: OutputPin, En: OutputPin, Si: OutputPin, So: InputPin, Delay: DelayNs {
    /// Bind the scan lines to pins.  `half_period_ns` is how long the clock stays high, and
    /// then low, on each pulse.
    pub fn new(half_period_ns: u32, clock: Clk, scan_en: En, scan_in: Si, scan_out: So, delay: Delay) -> Gpio<Clk, En, Si, So, Delay> {
        Gpio { half_period: half_period_ns, delay, clock, scan_en, scan_in, scan_out }
    }

    pub fn half_period_ns(&self) -> u32 {
        self.half_period
    }

    /// Drive every output line low, the state the device expects before the first scan.
    pub fn idle(&mut self) -> Result<(), ScanError> {
        self.scan_en.set_low().map_err(pin_error)?;
        self.scan_in.set_low().map_err(pin_error)?;
        self.clock.set_low().map_err(pin_error)
    }

    /// Give the pins and delay back
    pub fn release(self) -> (Clk, En, Si, So, Delay) {
        (self.clock, self.scan_en, self.scan_in, self.scan_out, self.delay)
    }
}

impl<Clk, En, Si, So, Delay> Cable for Gpio<Clk, En, Si, So, Delay> where Clk: OutputPin, En: OutputPin, Si: OutputPin, So: InputPin, Delay: DelayNs {
    fn set_scan_enable(&mut self, enable: bool) -> Result<(), ScanError> {
        trace!("scan_en <- {}", enable as u8);
        self.scan_en.set_state(PinState::from(enable)).map_err(pin_error)
    }

    fn set_scan_in(&mut self, bit: bool) -> Result<(), ScanError> {
        self.scan_in.set_state(PinState::from(bit)).map_err(pin_error)
    }

    fn pulse(&mut self) -> Result<(), ScanError> {
        // clock starts low
        self.clock.set_high().map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        self.clock.set_low().map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        Ok(())
    }

    fn scan_out(&mut self) -> Result<bool, ScanError> {
        self.scan_out.is_high().map_err(pin_error)
    }
}
