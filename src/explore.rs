//! Exhaustive probing of a small state machine through its scan chain.  `StateSpaceExplorer`
//! loads every possible value of a state register, drives one input line both ways, samples the
//! design's combinational outputs, lets the design take one functional clock edge and reads the
//! resulting state back.  The result is the machine's full transition and output table.
//!
//! The design is assumed to be synchronous with no hidden state outside the probed register, so
//! probing the same (state, input) pair twice gives the same row.
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::{info, trace};

use crate::cable::Cable;
use crate::error::{pin_error, ScanError};
use crate::layout::{chain_image, Register};
use crate::shift::ShiftProtocol;

/// Widest state register `explore_states` will enumerate
pub const MAX_EXPLORE_WIDTH: usize = 16;

/// A named combinational output of the design
pub struct Probe<P> {
    pub name: String,
    pub pin: P,
}

impl<P: InputPin> Probe<P> {
    pub fn new(name: &str, pin: P) -> Self {
        Self { name: name.to_string(), pin }
    }
}

/// One row of the transition table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: u64,
    pub input: bool,
    /// Probe values sampled before the clock edge, in probe order
    pub outputs: Vec<bool>,
    pub next_state: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionTable {
    pub input_name: String,
    pub probe_names: Vec<String>,
    pub rows: Vec<Transition>,
}

impl TransitionTable {
    pub fn lookup(&self, state: u64, input: bool) -> Option<&Transition> {
        self.rows.iter().find(|row| row.state == state && row.input == input)
    }
}

impl fmt::Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut headers = vec!["Current State", self.input_name.as_str()];
        headers.extend(self.probe_names.iter().map(String::as_str));
        headers.push("Next State");

        write!(f, "|")?;
        for h in &headers {
            write!(f, " {} |", h)?;
        }
        writeln!(f)?;
        write!(f, "|")?;
        for h in &headers {
            write!(f, "{:-<1$}|", "", h.len() + 2)?;
        }
        writeln!(f)?;

        for row in &self.rows {
            let mut cells = vec![row.state.to_string(), (row.input as u8).to_string()];
            cells.extend(row.outputs.iter().map(|&o| (o as u8).to_string()));
            cells.push(row.next_state.to_string());

            write!(f, "|")?;
            for (cell, h) in cells.iter().zip(&headers) {
                write!(f, " {:^1$} |", cell, h.len())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub struct StateSpaceExplorer<T, I, P> {
    pub shift: ShiftProtocol<T>,
    state: Register,
    input_name: String,
    input: I,
    probes: Vec<Probe<P>>,
}

impl<T, U, I, P> StateSpaceExplorer<T, I, P>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized,
          I: OutputPin,
          P: InputPin
{
    /// Probe the state register `state` through `shift`, driving the design input `input`
    /// (reported under `input_name`) and sampling `probes`.
    pub fn new(shift: ShiftProtocol<T>, state: &Register, input_name: &str, input: I, probes: Vec<Probe<P>>) -> Self {
        Self {
            shift,
            state: state.clone(),
            input_name: input_name.to_string(),
            input,
            probes,
        }
    }

    /// Run one (state, input) probe and return its row
    pub fn probe(&mut self, state: u64, input: bool) -> Result<Transition, ScanError> {
        let image = chain_image(self.shift.chain_length(), &[(&self.state, state)])?;

        // load leaves scan-enable low
        self.shift.load(&image, 0)?;
        self.input.set_state(PinState::from(input)).map_err(pin_error)?;

        let mut outputs = Vec::with_capacity(self.probes.len());
        for probe in &mut self.probes {
            outputs.push(probe.pin.is_high().map_err(pin_error)?);
        }

        self.shift.functional_clock()?;
        let next_state = self.shift.read_register(&self.state)?;

        trace!("probe: state {} input {} -> {}", state, input as u8, next_state);
        Ok(Transition { state, input, outputs, next_state })
    }

    /// Probe every value of the low `width` bits of the state register with the input low and
    /// then high, giving `2^width * 2` rows ordered by state, then input.
    pub fn explore_states(&mut self, width: usize) -> Result<TransitionTable, ScanError> {
        if width > self.state.size() || width > MAX_EXPLORE_WIDTH {
            return Err(ScanError::WidthTooLarge {
                register: self.state.name().to_string(),
                width,
                size: self.state.size(),
                max: MAX_EXPLORE_WIDTH,
            });
        }

        let states = 1u64 << width;
        info!("exploring {} states of '{}' against '{}'", states, self.state.name(), self.input_name);

        let mut rows = Vec::with_capacity(states as usize * 2);
        for state in 0..states {
            for input in [false, true] {
                rows.push(self.probe(state, input)?);
            }
        }

        Ok(TransitionTable {
            input_name: self.input_name.clone(),
            probe_names: self.probes.iter().map(|p| p.name.clone()).collect(),
            rows,
        })
    }
}
