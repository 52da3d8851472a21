use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel for a cell that had something in it but could not be read
pub const UNREADABLE: i32 = -1;

/// Sentinel for a cell with no value (must be filled in by the user)
pub const EMPTY: i32 = 0;

/// Number of regular numbers per row
pub const REGULAR_COUNT: usize = 5;

/// Largest number any supported game prints on a ticket
pub const MAX_TICKET_NUMBER: i32 = 99;

const LOTTERY_PREFIX: &str = "Lottery:";
const TICKET_MARKER: &str = "Ticket:";

/// One ticket row: 5 regular numbers plus the special number.
///
/// Every entry is a valid number, [`EMPTY`] or [`UNREADABLE`].
/// `special == EMPTY` means the row has no special number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TicketRow {
    pub numbers: [i32; REGULAR_COUNT],
    pub special: i32,
}

impl TicketRow {
    /// Build a row from up to 5 regular numbers, padding missing entries with [`EMPTY`].
    pub fn from_parts(numbers: &[i32], special: Option<i32>) -> Self {
        let mut padded = [EMPTY; REGULAR_COUNT];
        for (slot, value) in padded.iter_mut().zip(numbers.iter()) {
            *slot = *value;
        }

        Self {
            numbers: padded,
            special: special.unwrap_or(EMPTY),
        }
    }

    /// Special number, `None` when the row has none
    pub fn special_number(&self) -> Option<i32> {
        if self.special == EMPTY {
            None
        } else {
            Some(self.special)
        }
    }

    /// True when neither regular nor special numbers carry anything
    pub fn is_empty(&self) -> bool {
        self.numbers.iter().all(|&n| n == EMPTY) && self.special == EMPTY
    }

    /// Count of regular numbers that were actually recovered (> 0)
    pub fn recovered_regular(&self) -> usize {
        self.numbers.iter().filter(|&&n| n > 0).count()
    }

    /// True when the special number was recovered (> 0)
    pub fn has_special(&self) -> bool {
        self.special > 0
    }

    /// True when any entry is flagged unreadable
    pub fn needs_correction(&self) -> bool {
        self.numbers.contains(&UNREADABLE) || self.special == UNREADABLE
    }
}

impl fmt::Display for TicketRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.numbers {
            write!(f, "{} ", n)?;
        }
        write!(f, "{}", self.special)
    }
}

impl FromStr for TicketRow {
    type Err = ScanError;

    /// Parse `"n1 n2 n3 n4 n5 special"`; a missing special parses as [`EMPTY`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(|token| {
                let value: i32 = token
                    .parse()
                    .map_err(|e| ScanError::Format(format!("bad number '{}': {}", token, e)))?;
                if !is_wire_value(value) {
                    return Err(ScanError::Format(format!(
                        "number {} out of range (-1..={})",
                        value, MAX_TICKET_NUMBER
                    )));
                }
                Ok(value)
            })
            .collect::<Result<Vec<i32>, ScanError>>()?;

        match values.len() {
            5 => Ok(Self::from_parts(&values, None)),
            6 => Ok(Self::from_parts(&values[..5], Some(values[5]))),
            n => Err(ScanError::Format(format!(
                "row '{}' has {} numbers, expected 5 or 6",
                s, n
            ))),
        }
    }
}

/// Whether a value may appear in the canonical string
pub fn is_wire_value(value: i32) -> bool {
    (UNREADABLE..=MAX_TICKET_NUMBER).contains(&value)
}

/// Canonical wire representation passed to presentation:
/// `"Lottery: r1|r2|...|rN Ticket:<tag>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTicket {
    pub rows: Vec<TicketRow>,
    pub tag: String,
}

impl CanonicalTicket {
    pub fn new(rows: Vec<TicketRow>, tag: impl Into<String>) -> Self {
        Self {
            rows,
            tag: tag.into(),
        }
    }
}

impl fmt::Display for CanonicalTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self
            .rows
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("|");
        write!(f, "{} {} {}{}", LOTTERY_PREFIX, rows, TICKET_MARKER, self.tag)
    }
}

impl FromStr for CanonicalTicket {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(LOTTERY_PREFIX)
            .ok_or_else(|| ScanError::Format(format!("missing '{}' prefix", LOTTERY_PREFIX)))?;

        let marker = body
            .rfind(TICKET_MARKER)
            .ok_or_else(|| ScanError::Format(format!("missing '{}' marker", TICKET_MARKER)))?;

        let rows_part = body[..marker].trim();
        let tag = body[marker + TICKET_MARKER.len()..].trim().to_string();

        let rows = if rows_part.is_empty() {
            Vec::new()
        } else {
            rows_part
                .split('|')
                .map(TicketRow::from_str)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { rows, tag })
    }
}
