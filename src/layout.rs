//! Maps named registers onto positions in the scan chain.  A descriptor has one record per
//! flip-flop: its chain position, the register it belongs to and its bit index within that
//! register.  `parse` groups the records into `Register`s and totals the chain length.
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use log::{info, warn};

use crate::error::{LayoutError, ParseErrorKind, ScanError};

/// One descriptor record: flip-flop `position` holds bit `bit` of register `register`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainDescriptorEntry {
    pub position: usize,
    pub register: String,
    pub bit: usize,
}

impl ChainDescriptorEntry {
    /// Split one record into its three whitespace-separated fields.  `line` is only used for
    /// error reporting.
    pub fn parse_line(record: &str, line: usize) -> Result<Self, ScanError> {
        let fields: Vec<&str> = record.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ScanError::Parse {
                line,
                kind: ParseErrorKind::FieldCount(fields.len()),
            });
        }

        let integer = |field: &'static str, token: &str| {
            token.parse::<usize>().map_err(|_| ScanError::Parse {
                line,
                kind: ParseErrorKind::BadInteger {
                    field,
                    token: token.to_string(),
                },
            })
        };

        Ok(Self {
            position: integer("position", fields[0])?,
            register: fields[1].to_string(),
            bit: integer("bit index", fields[2])?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    name: String,
    // chain positions, local bit 0 first
    positions: Vec<usize>,
    // local bit indices from the descriptor, sorted, parallel to `positions`
    bits: Vec<usize>,
    content: Option<Vec<bool>>,
}

impl Register {
    fn new(name: &str, mut entries: Vec<(usize, usize)>) -> Self {
        // (bit, position); stable so repeated bit indices keep descriptor order
        entries.sort_by_key(|&(bit, _)| bit);
        Self {
            name: name.to_string(),
            positions: entries.iter().map(|&(_, position)| position).collect(),
            bits: entries.iter().map(|&(bit, _)| bit).collect(),
            content: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of flip-flops belonging to this register
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Chain positions ordered by local bit index, least significant bit first
    pub fn ordered_positions(&self) -> &[usize] {
        &self.positions
    }

    /// Chain position of the least significant bit.  This is not necessarily the smallest
    /// position.
    pub fn first(&self) -> usize {
        self.positions[0]
    }

    /// Chain position of the most significant bit
    pub fn last(&self) -> usize {
        self.positions[self.positions.len() - 1]
    }

    /// The smallest contiguous `(start, len)` window of the chain that covers every flip-flop
    /// of this register.  For a register laid out on consecutive positions this is
    /// `(first, size)`.  `None` if the window would end past `usize::MAX`.
    pub fn window(&self) -> Option<(usize, usize)> {
        let start = self.positions.iter().copied().min()?;
        let end = self.positions.iter().copied().max()?.checked_add(1)?;
        Some((start, end - start))
    }

    /// `window`, checked against a chain of `chain_length` flip-flops
    pub fn window_in(&self, chain_length: usize) -> Result<(usize, usize), ScanError> {
        let start = self.positions.iter().copied().min().unwrap_or(0);
        match self.window() {
            Some((start, len)) if start + len <= chain_length => Ok((start, len)),
            window => Err(ScanError::RangeViolation {
                start,
                end: window.map_or(usize::MAX, |(start, len)| start + len),
                chain_length,
            }),
        }
    }

    /// Cached bit values, least significant bit first.  Nothing in the shift protocol writes
    /// this; callers keep it up to date with `set_content` if they want it.
    pub fn content(&self) -> Option<&[bool]> {
        self.content.as_deref()
    }

    pub fn set_content(&mut self, value: u64) -> Result<(), ScanError> {
        self.check_value(value)?;
        self.content = Some((0..self.size()).map(|i| (value >> i) & 1 == 1).collect());
        Ok(())
    }

    fn check_value(&self, value: u64) -> Result<(), ScanError> {
        let fits = match self.size() {
            n if n > 64 => false,
            64 => true,
            n => value >> n == 0,
        };
        if fits {
            Ok(())
        } else {
            Err(ScanError::ValueTooWide {
                register: self.name.clone(),
                size: self.size(),
                value,
            })
        }
    }

    /// Write `value` into a chain image, bit `i` of the value going to `ordered_positions()[i]`.
    /// `image[p]` is the value of chain position `p`.
    pub fn encode(&self, value: u64, image: &mut [bool]) -> Result<(), ScanError> {
        self.check_value(value)?;
        self.check_image(image.len())?;
        for (i, &p) in self.positions.iter().enumerate() {
            image[p] = (value >> i) & 1 == 1;
        }
        Ok(())
    }

    /// Read this register's value back out of a chain image.  Inverse of `encode`.
    pub fn decode(&self, image: &[bool]) -> Result<u64, ScanError> {
        if self.size() > 64 {
            return Err(ScanError::ValueTooWide {
                register: self.name.clone(),
                size: self.size(),
                value: 0,
            });
        }
        self.check_image(image.len())?;
        Ok(self
            .positions
            .iter()
            .enumerate()
            .fold(0, |value, (i, &p)| value | (u64::from(image[p]) << i)))
    }

    fn check_image(&self, len: usize) -> Result<(), ScanError> {
        self.window_in(len).map(|_| ())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: Vec<u8> = match &self.content {
            Some(content) => content.iter().map(|&b| b as u8).collect(),
            None => vec![0; self.size()],
        };
        writeln!(f, "------------------")?;
        writeln!(f, "NAME:    {}", self.name)?;
        writeln!(f, "BITS:    {:?}", bits)?;
        writeln!(f, "INDICES: {:?}", self.positions)?;
        writeln!(f, "------------------")
    }
}

/// Every register of the chain, keyed by name, plus the total number of flip-flops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanChain {
    registers: BTreeMap<String, Register>,
    chain_length: usize,
}

impl ScanChain {
    /// Group descriptor records by register.  No completeness or duplicate checking is done;
    /// use `validate` for that.
    pub fn from_entries<I>(entries: I) -> Self
        where I: IntoIterator<Item = ChainDescriptorEntry>
    {
        let mut groups: BTreeMap<String, Vec<(usize, usize)>> = BTreeMap::new();
        let mut chain_length = 0;
        for entry in entries {
            groups.entry(entry.register).or_default().push((entry.bit, entry.position));
            chain_length += 1;
        }

        let registers: BTreeMap<String, Register> = groups
            .into_iter()
            .map(|(name, entries)| {
                let reg = Register::new(&name, entries);
                (name, reg)
            })
            .collect();

        info!("scan chain: {} registers over {} flip-flops", registers.len(), chain_length);
        Self {
            registers,
            chain_length,
        }
    }

    /// Read a descriptor file from disk and parse it
    #[cfg(feature = "std")]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ScanError::Io(std::format!("{}: {}", path.as_ref().display(), e)))?;
        parse(&text)
    }

    pub fn chain_length(&self) -> usize {
        self.chain_length
    }

    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.get(name)
    }

    pub fn register_mut(&mut self, name: &str) -> Option<&mut Register> {
        self.registers.get_mut(name)
    }

    /// Like `register`, but a missing name is an error
    pub fn get(&self, name: &str) -> Result<&Register, ScanError> {
        self.register(name).ok_or_else(|| ScanError::UnknownRegister(name.to_string()))
    }

    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.registers.values()
    }

    /// Check that every chain position belongs to exactly one register and that every register
    /// numbers its bits 0 through size - 1.
    pub fn validate(&self) -> Result<(), ScanError> {
        let result = self.check_layout();
        if let Err(err) = &result {
            warn!("scan chain layout rejected: {}", err);
        }
        result.map_err(ScanError::from)
    }

    fn check_layout(&self) -> Result<(), LayoutError> {
        let mut owners: Vec<Option<&str>> = vec![None; self.chain_length];
        for reg in self.registers.values() {
            for (expected, &bit) in reg.bits.iter().enumerate() {
                if bit < expected {
                    return Err(LayoutError::DuplicateBit {
                        register: reg.name.clone(),
                        bit,
                    });
                }
                if bit > expected {
                    return Err(LayoutError::MissingBit {
                        register: reg.name.clone(),
                        bit: expected,
                    });
                }
            }

            for &position in &reg.positions {
                let owner = owners.get_mut(position).ok_or_else(|| LayoutError::PositionOutOfRange {
                    register: reg.name.clone(),
                    position,
                    chain_length: self.chain_length,
                })?;
                if let Some(first) = *owner {
                    return Err(LayoutError::DuplicatePosition {
                        position,
                        first: first.to_string(),
                        second: reg.name.clone(),
                    });
                }
                *owner = Some(reg.name.as_str());
            }
        }

        // unreachable while chain_length equals the entry count
        match owners.iter().position(Option::is_none) {
            Some(position) => Err(LayoutError::MissingPosition(position)),
            None => Ok(()),
        }
    }

    /// A zeroed chain image with the given register values written into it
    pub fn image(&self, values: &[(&Register, u64)]) -> Result<Vec<bool>, ScanError> {
        chain_image(self.chain_length, values)
    }
}

/// A zeroed image of a `chain_length` flip-flop chain with the given register values written
/// into it
pub fn chain_image(chain_length: usize, values: &[(&Register, u64)]) -> Result<Vec<bool>, ScanError> {
    let mut image = vec![false; chain_length];
    for (reg, value) in values {
        reg.encode(*value, &mut image)?;
    }
    Ok(image)
}

impl fmt::Display for ScanChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---CHAIN DISPLAY---")?;
        writeln!(f)?;
        writeln!(f, "CHAIN SIZE: {}", self.chain_length)?;
        writeln!(f)?;
        writeln!(f, "REGISTERS:")?;
        writeln!(f)?;
        for reg in self.registers.values() {
            write!(f, "{}", reg)?;
        }
        Ok(())
    }
}

/// Parse descriptor text, one record per line.  Blank lines are skipped.  Fails on the first
/// malformed record; no partial chain is returned.
pub fn parse(descriptor: &str) -> Result<ScanChain, ScanError> {
    let entries = descriptor
        .lines()
        .enumerate()
        .filter(|(_, record)| !record.trim().is_empty())
        .map(|(i, record)| ChainDescriptorEntry::parse_line(record, i + 1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ScanChain::from_entries(entries))
}

/// `parse` followed by `ScanChain::validate`
pub fn parse_validated(descriptor: &str) -> Result<ScanChain, ScanError> {
    let chain = parse(descriptor)?;
    chain.validate()?;
    Ok(chain)
}
