//! FILENAME: core/engine/src/functions/text.rs
//! PURPOSE: Text built-ins (LEN, LEFT, SUBSTITUTE, FIND, ...).
//! CONTEXT: Positions and lengths count characters, not bytes, and are
//! 1-based as users see them.

use super::{integer, optional, text, FnResult, FunctionRegistry};
use crate::cell::{parse_plain_number, CellError};
use crate::evaluator::EvalResult;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_builtin("LEN", 1, Some(1), fn_len);
    registry.register_builtin("UPPER", 1, Some(1), fn_upper);
    registry.register_builtin("LOWER", 1, Some(1), fn_lower);
    registry.register_builtin("PROPER", 1, Some(1), fn_proper);
    registry.register_builtin("TRIM", 1, Some(1), fn_trim);
    registry.register_builtin("CONCATENATE", 1, None, fn_concatenate);
    registry.register_builtin("CONCAT", 1, None, fn_concatenate);
    registry.register_builtin("LEFT", 1, Some(2), fn_left);
    registry.register_builtin("RIGHT", 1, Some(2), fn_right);
    registry.register_builtin("MID", 3, Some(3), fn_mid);
    registry.register_builtin("REPT", 2, Some(2), fn_rept);
    registry.register_builtin("SUBSTITUTE", 3, Some(4), fn_substitute);
    registry.register_builtin("FIND", 2, Some(3), fn_find);
    registry.register_builtin("SEARCH", 2, Some(3), fn_search);
    registry.register_builtin("VALUE", 1, Some(1), fn_value);
    registry.register_builtin("EXACT", 2, Some(2), fn_exact);
}

/// Longest string REPT will build.
const MAX_TEXT_LEN: usize = 32_767;

fn count(args: &[EvalResult], index: usize, default: i64) -> Result<usize, CellError> {
    let n = optional(args, index, default, integer)?;
    usize::try_from(n).map_err(|_| CellError::Value)
}

fn fn_len(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(text(&args[0])?.chars().count() as f64))
}

fn fn_upper(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Text(text(&args[0])?.to_uppercase()))
}

fn fn_lower(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Text(text(&args[0])?.to_lowercase()))
}

/// Capitalizes the first letter of every run of letters.
fn fn_proper(args: &[EvalResult]) -> FnResult {
    let mut out = String::new();
    let mut in_word = false;
    for ch in text(&args[0])?.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    Ok(EvalResult::Text(out))
}

/// Strips both ends and collapses inner runs of spaces to one.
fn fn_trim(args: &[EvalResult]) -> FnResult {
    let s = text(&args[0])?;
    Ok(EvalResult::Text(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

/// Range arguments contribute every value in row-major order.
fn fn_concatenate(args: &[EvalResult]) -> FnResult {
    let mut out = String::new();
    for arg in args {
        for value in arg.flatten() {
            if let EvalResult::Error(e) = value {
                return Err(e);
            }
            out.push_str(&value.as_text());
        }
    }
    Ok(EvalResult::Text(out))
}

fn fn_left(args: &[EvalResult]) -> FnResult {
    let s = text(&args[0])?;
    let n = count(args, 1, 1)?;
    Ok(EvalResult::Text(s.chars().take(n).collect()))
}

fn fn_right(args: &[EvalResult]) -> FnResult {
    let s = text(&args[0])?;
    let n = count(args, 1, 1)?;
    let len = s.chars().count();
    Ok(EvalResult::Text(s.chars().skip(len.saturating_sub(n)).collect()))
}

fn fn_mid(args: &[EvalResult]) -> FnResult {
    let s = text(&args[0])?;
    let start = count(args, 1, 1)?;
    let n = count(args, 2, 0)?;
    if start < 1 {
        return Err(CellError::Value);
    }
    Ok(EvalResult::Text(s.chars().skip(start - 1).take(n).collect()))
}

fn fn_rept(args: &[EvalResult]) -> FnResult {
    let s = text(&args[0])?;
    let times = count(args, 1, 0)?;
    if s.chars().count().saturating_mul(times) > MAX_TEXT_LEN {
        return Err(CellError::Value);
    }
    Ok(EvalResult::Text(s.repeat(times)))
}

/// Replaces every occurrence, or only the Nth when an instance is given.
fn fn_substitute(args: &[EvalResult]) -> FnResult {
    let s = text(&args[0])?;
    let old = text(&args[1])?;
    let new = text(&args[2])?;
    if old.is_empty() {
        return Ok(EvalResult::Text(s));
    }

    if args.len() < 4 {
        return Ok(EvalResult::Text(s.replace(&old, &new)));
    }

    let instance = count(args, 3, 1)?;
    if instance < 1 {
        return Err(CellError::Value);
    }
    match s.match_indices(&old).nth(instance - 1) {
        Some((pos, _)) => {
            let mut out = String::with_capacity(s.len());
            out.push_str(&s[..pos]);
            out.push_str(&new);
            out.push_str(&s[pos + old.len()..]);
            Ok(EvalResult::Text(out))
        }
        None => Ok(EvalResult::Text(s)),
    }
}

/// Shared by FIND (case-sensitive) and SEARCH (case-insensitive).
/// Not found is #VALUE!.
fn locate(args: &[EvalResult], case_sensitive: bool) -> FnResult {
    let needle = text(&args[0])?;
    let haystack = text(&args[1])?;
    let start = count(args, 2, 1)?;
    if start < 1 || start > haystack.chars().count() + 1 {
        return Err(CellError::Value);
    }

    let (needle, haystack) = if case_sensitive {
        (needle, haystack)
    } else {
        (needle.to_lowercase(), haystack.to_lowercase())
    };

    let byte_start = haystack
        .char_indices()
        .nth(start - 1)
        .map_or(haystack.len(), |(i, _)| i);
    let found = haystack[byte_start..].find(&needle).ok_or(CellError::Value)?;
    let char_pos = haystack[..byte_start + found].chars().count() + 1;
    Ok(EvalResult::Number(char_pos as f64))
}

fn fn_find(args: &[EvalResult]) -> FnResult {
    locate(args, true)
}

fn fn_search(args: &[EvalResult]) -> FnResult {
    locate(args, false)
}

/// Converts text to a number, accepting `1,000` and `50%`.
fn fn_value(args: &[EvalResult]) -> FnResult {
    match args[0].scalar() {
        EvalResult::Number(n) => Ok(EvalResult::Number(n)),
        EvalResult::Error(e) => Err(e),
        EvalResult::Empty => Ok(EvalResult::Number(0.0)),
        other => {
            let s = other.as_text();
            let trimmed = s.trim();
            let parsed = match trimmed.strip_suffix('%') {
                Some(pct) => parse_plain_number(pct).map(|n| n / 100.0),
                None => parse_plain_number(&trimmed.replace(',', "")),
            };
            parsed.map(EvalResult::Number).ok_or(CellError::Value)
        }
    }
}

fn fn_exact(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(text(&args[0])? == text(&args[1])?))
}

#[cfg(test)]
mod tests {
    use crate::cell::CellError;
    use crate::evaluator::EvalResult;
    use crate::functions::FunctionRegistry;

    fn call(name: &str, args: &[EvalResult]) -> EvalResult {
        FunctionRegistry::new().call(name, args)
    }

    fn t(s: &str) -> EvalResult {
        EvalResult::Text(s.to_string())
    }

    fn n(v: f64) -> EvalResult {
        EvalResult::Number(v)
    }

    #[test]
    fn test_case_and_length() {
        assert_eq!(call("LEN", &[t("héllo")]), n(5.0));
        assert_eq!(call("LEN", &[n(123.5)]), n(5.0));
        assert_eq!(call("UPPER", &[t("abc")]), t("ABC"));
        assert_eq!(call("LOWER", &[t("ABC")]), t("abc"));
        assert_eq!(call("PROPER", &[t("hello WORLD-wide")]), t("Hello World-Wide"));
        assert_eq!(call("TRIM", &[t("  a   b  ")]), t("a b"));
    }

    #[test]
    fn test_slicing() {
        assert_eq!(call("LEFT", &[t("Spreadsheet")]), t("S"));
        assert_eq!(call("LEFT", &[t("Spreadsheet"), n(6.0)]), t("Spread"));
        assert_eq!(call("RIGHT", &[t("Spreadsheet"), n(5.0)]), t("sheet"));
        assert_eq!(call("RIGHT", &[t("ab"), n(10.0)]), t("ab"));
        assert_eq!(call("MID", &[t("Spreadsheet"), n(3.0), n(4.0)]), t("read"));
        assert_eq!(call("MID", &[t("abc"), n(0.0), n(1.0)]), EvalResult::Error(CellError::Value));
        assert_eq!(call("LEFT", &[t("abc"), n(-1.0)]), EvalResult::Error(CellError::Value));
    }

    #[test]
    fn test_concatenate() {
        let range = EvalResult::Array(vec![vec![t("a"), n(1.0)], vec![EvalResult::Empty, EvalResult::Boolean(true)]]);
        assert_eq!(call("CONCATENATE", &[range, t("!")]), t("a1TRUE!"));
        assert_eq!(
            call("CONCAT", &[t("a"), EvalResult::Error(CellError::Ref)]),
            EvalResult::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_substitute_and_rept() {
        assert_eq!(call("SUBSTITUTE", &[t("a-b-c"), t("-"), t("+")]), t("a+b+c"));
        assert_eq!(call("SUBSTITUTE", &[t("a-b-c"), t("-"), t("+"), n(2.0)]), t("a-b+c"));
        assert_eq!(call("SUBSTITUTE", &[t("abc"), t(""), t("x")]), t("abc"));
        assert_eq!(call("REPT", &[t("ab"), n(3.0)]), t("ababab"));
        assert_eq!(call("REPT", &[t("ab"), n(100000.0)]), EvalResult::Error(CellError::Value));
    }

    #[test]
    fn test_find_and_search() {
        assert_eq!(call("FIND", &[t("b"), t("abcb")]), n(2.0));
        assert_eq!(call("FIND", &[t("b"), t("abcb"), n(3.0)]), n(4.0));
        assert_eq!(call("FIND", &[t("B"), t("abc")]), EvalResult::Error(CellError::Value));
        assert_eq!(call("SEARCH", &[t("B"), t("abc")]), n(2.0));
    }

    #[test]
    fn test_value_and_exact() {
        assert_eq!(call("VALUE", &[t(" 1,234.5 ")]), n(1234.5));
        assert_eq!(call("VALUE", &[t("25%")]), n(0.25));
        assert_eq!(call("VALUE", &[t("abc")]), EvalResult::Error(CellError::Value));
        assert_eq!(call("EXACT", &[t("a"), t("A")]), EvalResult::Boolean(false));
        assert_eq!(call("EXACT", &[t("a"), t("a")]), EvalResult::Boolean(true));
    }
}
