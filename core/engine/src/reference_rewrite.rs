//! FILENAME: core/engine/src/reference_rewrite.rs
//! PURPOSE: Rewrites the references inside formula text for row/column
//! insertion and deletion.
//! CONTEXT: Uses the same `shift_address` / `shift_range` rules as the
//! dependency graph, so stored text and graph edges always agree after a
//! structural edit. A reference whose target was deleted becomes `#REF!`.
//! Text inside string literals and function names is never touched.

use once_cell::sync::Lazy;
use regex::Regex;

use cellcalc_parser::{
    format_address, format_range, parse_address, parse_range, shift_address, shift_range, Axis,
    CellError,
};

/// A1-style cell reference or range, with optional `$` markers.
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$?[A-Za-z]+\$?[0-9]+(?::\$?[A-Za-z]+\$?[0-9]+)?")
        .expect("reference regex must compile")
});

/// Shifts every reference in `formula` for an edit at `pivot` on `axis`.
/// `delta > 0` inserts, `delta < 0` deletes `|delta|` rows/columns.
pub fn shift_formula_references(formula: &str, axis: Axis, pivot: u32, delta: i64) -> String {
    if delta == 0 {
        return formula.to_string();
    }

    let mut out = String::with_capacity(formula.len() + 8);
    for (segment, quoted) in split_string_literals(formula) {
        if quoted {
            out.push_str(segment);
        } else {
            shift_segment(segment, axis, pivot, delta, &mut out);
        }
    }
    out
}

/// Splits formula text into alternating code and string-literal pieces.
/// String literals keep their quotes; `\"` does not end a literal.
fn split_string_literals(formula: &str) -> Vec<(&str, bool)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in formula.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                pieces.push((&formula[start..i + 1], true));
                start = i + 1;
                in_string = false;
            }
        } else if ch == '"' {
            if start < i {
                pieces.push((&formula[start..i], false));
            }
            start = i;
            in_string = true;
        }
    }

    if start < formula.len() {
        // An unterminated literal is left as-is
        pieces.push((&formula[start..], in_string));
    }
    pieces
}

fn shift_segment(segment: &str, axis: Axis, pivot: u32, delta: i64, out: &mut String) {
    let mut last = 0;
    for m in REFERENCE_RE.find_iter(segment) {
        if !is_standalone(segment, m.start(), m.end()) {
            continue;
        }
        out.push_str(&segment[last..m.start()]);
        out.push_str(&rewrite_reference(m.as_str(), axis, pivot, delta));
        last = m.end();
    }
    out.push_str(&segment[last..]);
}

/// A match glued to an identifier, a number, an error literal or a
/// function-call parenthesis is not a reference.
fn is_standalone(segment: &str, start: usize, end: usize) -> bool {
    let before = segment[..start].chars().next_back();
    let after = segment[end..].chars().next();

    let bad_before = matches!(before, Some(c) if c.is_ascii_alphanumeric() || matches!(c, '$' | '.' | '#' | '_'));
    let bad_after = matches!(after, Some(c) if c.is_ascii_alphanumeric() || matches!(c, '(' | '$' | '_'));
    !bad_before && !bad_after
}

fn rewrite_reference(text: &str, axis: Axis, pivot: u32, delta: i64) -> String {
    if text.contains(':') {
        let Some(range) = parse_range(text) else {
            return text.to_string();
        };
        match shift_range(&range, axis, pivot, delta) {
            Some(shifted) if shifted == range => text.to_string(),
            Some(shifted) => format_range(&shifted),
            None => CellError::Ref.code().to_string(),
        }
    } else {
        let Some(address) = parse_address(text) else {
            return text.to_string();
        };
        match shift_address(&address, axis, pivot, delta) {
            Some(shifted) if shifted == address => text.to_string(),
            Some(shifted) => format_address(&shifted),
            None => CellError::Ref.code().to_string(),
        }
    }
}
