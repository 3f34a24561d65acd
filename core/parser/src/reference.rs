//! FILENAME: core/parser/src/reference.rs
//! PURPOSE: Converts between A1-style text references and structured addresses.
//! CONTEXT: Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally. A `$` before the column letters
//! or the row digits marks that coordinate as absolute.
//!
//! The same `shift_address` rule drives both the dependency graph rewrite and
//! the formula text rewrite performed on row/column insertion and deletion.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\$?)([A-Za-z]+)(\$?)([0-9]+)$").expect("address regex must compile")
});

/// Which grid axis a structural edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Col,
}

/// A single cell address with independent absolute flags per coordinate.
/// Column and row are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub col: u32,
    pub row: u32,
    pub col_absolute: bool,
    pub row_absolute: bool,
}

impl CellAddress {
    /// A fully relative address.
    pub fn new(col: u32, row: u32) -> Self {
        CellAddress {
            col,
            row,
            col_absolute: false,
            row_absolute: false,
        }
    }

    pub fn with_absolute(mut self, col_absolute: bool, row_absolute: bool) -> Self {
        self.col_absolute = col_absolute;
        self.row_absolute = row_absolute;
        self
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.col, self.row)
    }

    fn coordinate(&self, axis: Axis) -> (u32, bool) {
        match axis {
            Axis::Row => (self.row, self.row_absolute),
            Axis::Col => (self.col, self.col_absolute),
        }
    }

    fn with_coordinate(mut self, axis: Axis, value: u32) -> Self {
        match axis {
            Axis::Row => self.row = value,
            Axis::Col => self.col = value,
        }
        self
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_address(self))
    }
}

/// A rectangular range, normalized so `start` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Builds a range from two corners, normalizing each axis independently.
    /// Absolute flags travel with the coordinate they were written on.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (start_col, start_col_abs, end_col, end_col_abs) = if a.col <= b.col {
            (a.col, a.col_absolute, b.col, b.col_absolute)
        } else {
            (b.col, b.col_absolute, a.col, a.col_absolute)
        };
        let (start_row, start_row_abs, end_row, end_row_abs) = if a.row <= b.row {
            (a.row, a.row_absolute, b.row, b.row_absolute)
        } else {
            (b.row, b.row_absolute, a.row, a.row_absolute)
        };

        CellRange {
            start: CellAddress {
                col: start_col,
                row: start_row,
                col_absolute: start_col_abs,
                row_absolute: start_row_abs,
            },
            end: CellAddress {
                col: end_col,
                row: end_row,
                col_absolute: end_col_abs,
                row_absolute: end_row_abs,
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of cells covered, saturating rather than overflowing.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.width()).saturating_mul(u64::from(self.height()))
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.start.col && col <= self.end.col && row >= self.start.row && row <= self.end.row
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_range(self))
    }
}

/// Canonical map key for a (col, row) pair. Absolute flags are not part of
/// the identity: `$A$1` and `A1` name the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub col: u32,
    pub row: u32,
}

impl CellKey {
    pub fn new(col: u32, row: u32) -> Self {
        CellKey { col, row }
    }

    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.col, self.row)
    }
}

/// Compact encoding: `"col,row"`.
impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

impl FromStr for CellKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (col, row) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid cell key: {}", s))?;
        let col = col
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid cell key column: {}", s))?;
        let row = row
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid cell key row: {}", s))?;
        Ok(CellKey::new(col, row))
    }
}

impl From<CellAddress> for CellKey {
    fn from(address: CellAddress) -> Self {
        address.key()
    }
}

/// Converts column letters (case-insensitive) to a 0-based column index.
/// "A" -> 0, "Z" -> 25, "AA" -> 26. Returns None on empty input, non-letters,
/// or overflow.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut acc: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc - 1)
}

/// Converts a 0-based column index to letters (0 -> "A", 26 -> "AA").
pub fn column_to_letters(col: u32) -> String {
    let mut result = Vec::new();
    let mut n = u64::from(col) + 1;
    while n > 0 {
        n -= 1;
        result.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Parses "A1", "$B$3", "aa12". Returns None when the text is not an address;
/// callers decide how to surface that.
pub fn parse_address(text: &str) -> Option<CellAddress> {
    let caps = ADDRESS_RE.captures(text.trim())?;
    let col = letters_to_column(&caps[2])?;
    let row = caps[4].parse::<u32>().ok()?.checked_sub(1)?;

    Some(CellAddress {
        col,
        row,
        col_absolute: !caps[1].is_empty(),
        row_absolute: !caps[3].is_empty(),
    })
}

/// Exact inverse of `parse_address` (letters are always uppercase).
pub fn format_address(address: &CellAddress) -> String {
    format!(
        "{}{}{}{}",
        if address.col_absolute { "$" } else { "" },
        column_to_letters(address.col),
        if address.row_absolute { "$" } else { "" },
        u64::from(address.row) + 1
    )
}

/// Parses "A1:B5" (either corner order) into a normalized range.
pub fn parse_range(text: &str) -> Option<CellRange> {
    let mut parts = text.split(':');
    let start = parse_address(parts.next()?)?;
    let end = parse_address(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(CellRange::new(start, end))
}

pub fn format_range(range: &CellRange) -> String {
    format!("{}:{}", format_address(&range.start), format_address(&range.end))
}

/// Every address in the range, row-major. Used for dependency bookkeeping;
/// evaluation reads ranges as a 2-D block instead.
pub fn expand_range(range: &CellRange) -> Vec<CellAddress> {
    let mut out = Vec::with_capacity(range.cell_count().min(1 << 16) as usize);
    for row in range.start.row..=range.end.row {
        for col in range.start.col..=range.end.col {
            out.push(CellAddress::new(col, row));
        }
    }
    out
}

/// Moves an address for a structural edit at `pivot` on `axis`.
///
/// A relative coordinate at or after `pivot` moves by `delta`. When `delta`
/// is negative the span `[pivot, pivot - delta)` is being deleted and a
/// relative coordinate inside it is invalidated (None). Absolute coordinates
/// never move.
pub fn shift_address(address: &CellAddress, axis: Axis, pivot: u32, delta: i64) -> Option<CellAddress> {
    let (value, absolute) = address.coordinate(axis);
    if absolute || value < pivot || delta == 0 {
        return Some(*address);
    }

    if delta < 0 {
        let deleted_end = u64::from(pivot) + delta.unsigned_abs();
        if u64::from(value) < deleted_end {
            return None;
        }
    }

    let moved = i64::from(value) + delta;
    let moved = u32::try_from(moved).ok()?;
    Some(address.with_coordinate(axis, moved))
}

/// Moves a range for a structural edit. Endpoints that fall inside a deleted
/// span are pulled in to the surviving edge, so `A1:A10` loses the deleted
/// rows rather than becoming invalid. A range whose every cell on `axis` is
/// deleted is invalidated.
pub fn shift_range(range: &CellRange, axis: Axis, pivot: u32, delta: i64) -> Option<CellRange> {
    let start = shift_address(&range.start, axis, pivot, delta);
    let end = shift_address(&range.end, axis, pivot, delta);

    match (start, end) {
        (Some(start), Some(end)) => Some(CellRange { start, end }),
        (None, Some(end)) => {
            // Start was deleted: it becomes the first row/col after the gap,
            // which after the shift sits at `pivot`.
            let start = range.start.with_coordinate(axis, pivot);
            let (end_value, _) = end.coordinate(axis);
            if end_value < pivot {
                return None;
            }
            Some(CellRange { start, end })
        }
        (Some(start), None) => {
            // End was deleted: it becomes the last row/col before the gap.
            let end_value = pivot.checked_sub(1)?;
            let (start_value, _) = start.coordinate(axis);
            if start_value > end_value {
                return None;
            }
            let end = range.end.with_coordinate(axis, end_value);
            Some(CellRange { start, end })
        }
        // Both corners inside the deleted span
        (None, None) => None,
    }
}

/// Cycles a single address through relative -> `$A$1` -> `A$1` -> `$A1` ->
/// relative. Anything that is not a single address is returned unchanged.
pub fn toggle_absolute(text: &str) -> String {
    let Some(address) = parse_address(text) else {
        return text.to_string();
    };

    let (col_absolute, row_absolute) = match (address.col_absolute, address.row_absolute) {
        (false, false) => (true, true),
        (true, true) => (false, true),
        (false, true) => (true, false),
        (true, false) => (false, false),
    };

    format_address(&address.with_absolute(col_absolute, row_absolute))
}
