use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How the items of a group (or the top level of a run) are scheduled.
///
/// - `Series`: one at a time, in declared order; an error halts the
///   remaining siblings unless the run continues past errors.
/// - `Parallel`: all items start together and finish independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Series,
    Parallel,
}

impl RunMode {
    pub fn is_parallel(self) -> bool {
        matches!(self, RunMode::Parallel)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Series => f.write_str("series"),
            RunMode::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "series" => Ok(RunMode::Series),
            "parallel" => Ok(RunMode::Parallel),
            other => Err(format!(
                "invalid run_mode: {other} (expected \"series\" or \"parallel\")"
            )),
        }
    }
}
