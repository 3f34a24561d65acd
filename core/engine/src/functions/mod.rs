//! FILENAME: core/engine/src/functions/mod.rs
//! PURPOSE: Name-indexed table of callable spreadsheet functions.
//! CONTEXT: The evaluator evaluates every argument, then hands the values to
//! `FunctionRegistry::call`. The registry checks arity, runs the function,
//! and turns a panicking implementation into #VALUE!. It never short-circuits
//! on error arguments; each function decides how to treat them.
//!
//! Built-ins are grouped by category in the sibling modules. Hosts can add
//! their own functions with `register`.

mod datetime;
mod logical;
mod lookup;
mod math;
mod statistical;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::warn;

use crate::cell::CellError;
use crate::evaluator::EvalResult;

/// Signature of a callable function. Arguments arrive already evaluated.
pub type NativeFunction = Arc<dyn Fn(&[EvalResult]) -> EvalResult + Send + Sync>;

/// Built-ins are written against this so they can use `?` on arguments.
pub(crate) type FnResult = Result<EvalResult, CellError>;

/// A registered function and its accepted argument count.
#[derive(Clone)]
pub struct FunctionDef {
    pub min_args: usize,
    /// None means any number of arguments.
    pub max_args: Option<usize>,
    func: NativeFunction,
}

impl FunctionDef {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        FunctionRegistry::new()
    }
}

impl FunctionRegistry {
    /// Creates a registry holding every built-in function.
    pub fn new() -> Self {
        let mut registry = FunctionRegistry::empty();
        math::register(&mut registry);
        logical::register(&mut registry);
        text::register(&mut registry);
        lookup::register(&mut registry);
        statistical::register(&mut registry);
        datetime::register(&mut registry);
        registry
    }

    /// Creates a registry with no functions at all.
    pub fn empty() -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
        }
    }

    /// Adds or replaces a function. Names are case-insensitive.
    pub fn register<F>(&mut self, name: &str, min_args: usize, max_args: Option<usize>, func: F)
    where
        F: Fn(&[EvalResult]) -> EvalResult + Send + Sync + 'static,
    {
        self.functions.insert(
            name.to_uppercase(),
            FunctionDef {
                min_args,
                max_args,
                func: Arc::new(func),
            },
        );
    }

    pub(crate) fn register_builtin(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        func: fn(&[EvalResult]) -> FnResult,
    ) {
        self.register(name, min_args, max_args, move |args| {
            func(args).unwrap_or_else(EvalResult::Error)
        });
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sorted names of all registered functions.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invokes a function by name.
    /// Unknown name gives #NAME?, wrong argument count gives #VALUE!.
    pub fn call(&self, name: &str, args: &[EvalResult]) -> EvalResult {
        let Some(def) = self.get(name) else {
            return EvalResult::Error(CellError::Name);
        };
        if !def.accepts(args.len()) {
            return EvalResult::Error(CellError::Value);
        }

        match catch_unwind(AssertUnwindSafe(|| (def.func)(args))) {
            Ok(result) => result,
            Err(_) => {
                warn!("Function {} panicked; returning #VALUE!", name);
                EvalResult::Error(CellError::Value)
            }
        }
    }
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

/// Reduces an argument to a single value, failing on an error sentinel.
pub(crate) fn scalar(arg: &EvalResult) -> Result<EvalResult, CellError> {
    match arg.scalar() {
        EvalResult::Error(e) => Err(e),
        value => Ok(value),
    }
}

/// Numeric argument; text that is not a number is #VALUE!.
pub(crate) fn number(arg: &EvalResult) -> Result<f64, CellError> {
    scalar(arg)?.as_number().ok_or(CellError::Value)
}

/// Integer argument, truncated toward zero.
pub(crate) fn integer(arg: &EvalResult) -> Result<i64, CellError> {
    Ok(number(arg)?.trunc() as i64)
}

pub(crate) fn text(arg: &EvalResult) -> Result<String, CellError> {
    Ok(scalar(arg)?.as_text())
}

pub(crate) fn boolean(arg: &EvalResult) -> Result<bool, CellError> {
    scalar(arg)?.as_boolean().ok_or(CellError::Value)
}

/// Optional argument with a default.
pub(crate) fn optional<T>(
    args: &[EvalResult],
    index: usize,
    default: T,
    convert: fn(&EvalResult) -> Result<T, CellError>,
) -> Result<T, CellError> {
    match args.get(index) {
        Some(arg) => convert(arg),
        None => Ok(default),
    }
}

/// Collects the numbers an aggregate works on.
///
/// Values inside ranges count only when they are numbers; text, booleans,
/// blanks and errors there are skipped. A value passed directly counts when
/// it coerces to a number, is skipped when it is non-numeric text, and an
/// error passed directly is returned.
pub(crate) fn collect_numbers(args: &[EvalResult]) -> Result<Vec<f64>, CellError> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            EvalResult::Array(_) => {
                numbers.extend(arg.flatten().iter().filter_map(|v| match v {
                    EvalResult::Number(n) => Some(*n),
                    _ => None,
                }));
            }
            EvalResult::Error(e) => return Err(*e),
            EvalResult::Empty => {}
            other => {
                if let Some(n) = other.as_number() {
                    numbers.push(n);
                }
            }
        }
    }
    Ok(numbers)
}

/// A range argument as rows of values; a single value is a 1x1 table.
pub(crate) fn table(arg: &EvalResult) -> Result<Vec<Vec<EvalResult>>, CellError> {
    match arg {
        EvalResult::Array(rows) => Ok(rows.clone()),
        EvalResult::Error(e) => Err(*e),
        other => Ok(vec![vec![other.clone()]]),
    }
}
