//! A small runner for end-to-end checks such as "load these operands, clock once, read the
//! result".  A scenario whose value is wrong is recorded as an `AssertionFailure` and the
//! remaining scenarios still run.  Protocol errors (pin faults, bad windows) stop the run.
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::{info, warn};
use thiserror::Error;

use crate::error::ScanError;

pub struct Case<I> {
    pub name: String,
    pub input: I,
    pub expected: u64,
}

impl<I> Case<I> {
    pub fn new(name: &str, input: I, expected: u64) -> Self {
        Self { name: name.to_string(), input, expected }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: expected {expected}, got {actual}")]
pub struct AssertionFailure {
    pub name: String,
    pub expected: u64,
    pub actual: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub passed: usize,
    pub failures: Vec<AssertionFailure>,
}

impl ScenarioReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Evaluate every case with `eval` and compare against its expected value
pub fn run<I, F>(cases: &[Case<I>], mut eval: F) -> Result<ScenarioReport, ScanError>
    where F: FnMut(&I) -> Result<u64, ScanError>
{
    let mut report = ScenarioReport::default();
    for case in cases {
        let actual = eval(&case.input)?;
        if actual == case.expected {
            info!("{}: {} ok", case.name, actual);
            report.passed += 1;
        } else {
            let failure = AssertionFailure {
                name: case.name.clone(),
                expected: case.expected,
                actual,
            };
            warn!("{}", failure);
            report.failures.push(failure);
        }
    }
    Ok(report)
}
