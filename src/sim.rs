//! An in-memory device for tests: a scan chain with optional functional logic behind a set of
//! `embedded-hal` pins.  The clock pin evaluates the device on its rising edge.
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::cable::gpio::{Gpio, DEFAULT_HALF_PERIOD_NS};

pub const ADDER: &str = "\
    8 x_out 0\n\
    0 b_reg 0\n\
    4 a_reg 0\n\
    9 x_out 1\n\
    1 b_reg 1\n\
    5 a_reg 1\n\
    10 x_out 2\n\
    2 b_reg 2\n\
    6 a_reg 2\n\
    11 x_out 3\n\
    3 b_reg 3\n\
    7 a_reg 3\n\
    12 x_out 4\n";

type Logic = Box<dyn FnMut(&mut [bool], bool)>;
type Outputs = Box<dyn Fn(&[bool], bool) -> Vec<bool>>;

pub struct Device {
    pub chain: Vec<bool>,
    pub clk: bool,
    pub scan_en: bool,
    pub scan_in: bool,
    pub scan_out: bool,
    pub input: bool,
    pub elapsed_ns: u64,
    pub shift_edges: usize,
    pub functional_edges: usize,
    logic: Logic,
    outputs: Outputs,
}

impl Device {
    fn rising_edge(&mut self) {
        if self.scan_en {
            let last = self.chain.len() - 1;
            self.scan_out = self.chain[last];
            self.chain.rotate_right(1);
            self.chain[0] = self.scan_in;
            self.shift_edges += 1;
        } else {
            (self.logic)(&mut self.chain, self.input);
            self.functional_edges += 1;
        }
    }

    fn drive(&mut self, line: Line, high: bool) {
        match line {
            Line::Clock => {
                if high && !self.clk {
                    self.rising_edge();
                }
                self.clk = high;
            }
            Line::ScanEnable => self.scan_en = high,
            Line::ScanIn => self.scan_in = high,
            Line::Input => self.input = high,
            Line::ScanOut | Line::Probe(_) => {}
        }
    }

    fn sense(&self, line: Line) -> bool {
        match line {
            Line::Clock => self.clk,
            Line::ScanEnable => self.scan_en,
            Line::ScanIn => self.scan_in,
            Line::Input => self.input,
            Line::ScanOut => self.scan_out,
            Line::Probe(i) => (self.outputs)(&self.chain, self.input)[i],
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Line {
    Clock,
    ScanEnable,
    ScanIn,
    ScanOut,
    Input,
    Probe(usize),
}

#[derive(Clone)]
pub struct SimDevice(Rc<RefCell<Device>>);

pub type SimGpio = Gpio<SimPin, SimPin, SimPin, SimPin, SimDelay>;

impl SimDevice {
    /// `logic` runs on every functional clock edge with the chain and the input line;
    /// `outputs` computes the combinational probe lines from the same.
    pub fn new<L, O>(chain_length: usize, logic: L, outputs: O) -> Self
        where L: FnMut(&mut [bool], bool) + 'static,
              O: Fn(&[bool], bool) -> Vec<bool> + 'static
    {
        Self(Rc::new(RefCell::new(Device {
            chain: vec![false; chain_length],
            clk: false,
            scan_en: false,
            scan_in: false,
            scan_out: false,
            input: false,
            elapsed_ns: 0,
            shift_edges: 0,
            functional_edges: 0,
            logic: Box::new(logic),
            outputs: Box::new(outputs),
        })))
    }

    /// A chain whose functional clock edges change nothing
    pub fn idle(chain_length: usize) -> Self {
        Self::new(chain_length, |_, _| {}, |_, _| Vec::new())
    }

    pub fn pin(&self, line: Line) -> SimPin {
        SimPin { dev: self.clone(), line }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.clone())
    }

    pub fn gpio(&self, half_period_ns: u32) -> SimGpio {
        Gpio::new(
            half_period_ns,
            self.pin(Line::Clock),
            self.pin(Line::ScanEnable),
            self.pin(Line::ScanIn),
            self.pin(Line::ScanOut),
            self.delay(),
        )
    }

    pub fn default_gpio(&self) -> SimGpio {
        self.gpio(DEFAULT_HALF_PERIOD_NS)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Device) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

pub struct SimPin {
    dev: SimDevice,
    line: Line,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.dev.with(|d| d.drive(self.line, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.dev.with(|d| d.drive(self.line, true));
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.dev.with(|d| d.sense(self.line)))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

pub struct SimDelay(SimDevice);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.with(|d| d.elapsed_ns += u64::from(ns));
    }
}

#[derive(Debug)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A pin whose every access fails
pub struct StuckPin;

impl ErrorType for StuckPin {
    type Error = PinFault;
}

impl OutputPin for StuckPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }
}

impl InputPin for StuckPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(PinFault)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(PinFault)
    }
}

/// Read `width` bits of a register laid out on consecutive positions from `base`
pub fn field(chain: &[bool], base: usize, width: usize) -> u64 {
    (0..width).fold(0, |v, i| v | (u64::from(chain[base + i]) << i))
}

pub fn set_field(chain: &mut [bool], base: usize, width: usize, value: u64) {
    for i in 0..width {
        chain[base + i] = (value >> i) & 1 == 1;
    }
}

/// The adder behind `ADDER`: each functional edge writes `a_reg + b_reg` into `x_out`.
pub fn adder() -> SimDevice {
    SimDevice::new(
        13,
        |chain, _| {
            let sum = field(chain, 0, 4) + field(chain, 4, 4);
            set_field(chain, 8, 5, sum);
        },
        |_, _| Vec::new(),
    )
}
