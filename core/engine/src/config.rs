//! FILENAME: core/engine/src/config.rs
//! PURPOSE: Engine settings: calculation mode and range expansion limits.
//! CONTEXT: Hosts build an `EngineConfig` (or deserialize one from their own
//! settings file) and hand it to `FormulaEngine::with_config`.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

/// Largest range, in cells, that is expanded into dependency edges or
/// materialized for evaluation.
pub const DEFAULT_MAX_RANGE_CELLS: usize = 1_000_000;

/// Whether edits cascade to dependents immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMode {
    #[default]
    Automatic,
    /// Only the edited cell is evaluated; dependents wait for `recalculate_all`.
    Manual,
}

impl CalculationMode {
    /// Lenient parse used for host-supplied strings.
    /// Unknown values fall back to automatic.
    pub fn parse_lenient(mode: &str) -> CalculationMode {
        mode.parse().unwrap_or_else(|_| {
            warn!("Unknown calculation mode '{}', using automatic", mode);
            CalculationMode::Automatic
        })
    }
}

impl FromStr for CalculationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(CalculationMode::Automatic),
            "manual" => Ok(CalculationMode::Manual),
            other => Err(format!("Invalid calculation mode: {}", other)),
        }
    }
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationMode::Automatic => write!(f, "automatic"),
            CalculationMode::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub calculation_mode: CalculationMode,
    pub max_range_cells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            calculation_mode: CalculationMode::Automatic,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }
}
