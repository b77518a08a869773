//! CSV and JSON writers.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::types::SimulationResults;
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultsFormat {
    #[default]
    Csv,
    Json,
}

impl ResultsFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ResultsFormat::Csv => "csv",
            ResultsFormat::Json => "json",
        }
    }
}

impl FromStr for ResultsFormat {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ResultsFormat::Csv),
            "json" => Ok(ResultsFormat::Json),
            _ => Err(ResultsError::UnknownFormat { name: s.to_string() }),
        }
    }
}

impl fmt::Display for ResultsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Header `time,<symbols>`, one row per time point. Fluctuations, when
/// present, follow as a final `#fluctuation,...` row.
pub fn write_csv<W: Write>(results: &SimulationResults, mut out: W) -> ResultsResult<()> {
    write!(out, "time")?;
    for name in &results.symbol_names {
        write!(out, ",{name}")?;
    }
    writeln!(out)?;

    for (t, row) in results.time_values.iter().zip(&results.symbol_values) {
        write!(out, "{t}")?;
        for v in row {
            write!(out, ",{v}")?;
        }
        writeln!(out)?;
    }

    if let Some(fluct) = &results.fluctuations {
        write!(out, "#fluctuation")?;
        for v in fluct {
            write!(out, ",{v}")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(results: &SimulationResults, mut out: W) -> ResultsResult<()> {
    serde_json::to_writer_pretty(&mut out, results)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_results<W: Write>(
    results: &SimulationResults,
    format: ResultsFormat,
    out: W,
) -> ResultsResult<()> {
    match format {
        ResultsFormat::Csv => write_csv(results, out),
        ResultsFormat::Json => write_json(results, out),
    }
}
