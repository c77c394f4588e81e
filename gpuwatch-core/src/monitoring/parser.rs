//! Parser for `nvidia-smi` CSV query output
//!
//! The diagnostic command prints one line per accelerator:
//! `index, memory.used, memory.total, utilization.gpu, name`. Parsing is
//! strict: a single malformed line rejects the whole output so drift in the
//! remote tool shows up immediately instead of as silently missing devices.

use super::metrics::GpuMetric;
use crate::error::{ParseError, ParseResult};

/// Diagnostic command run on every host.
pub const GPU_QUERY_COMMAND: &str = concat!(
    "nvidia-smi ",
    "--query-gpu=index,memory.used,memory.total,utilization.gpu,name ",
    "--format=csv,noheader,nounits",
);

/// Number of comma-separated fields before the free-form model name
const NUMERIC_FIELDS: usize = 4;

/// Stateless parser for diagnostic command output
pub struct MetricsParser;

impl MetricsParser {
    /// Parses the full output of [`GPU_QUERY_COMMAND`].
    ///
    /// Blank lines are ignored, so empty output yields no devices.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the first malformed line.
    pub fn parse(output: &str) -> ParseResult<Vec<GpuMetric>> {
        output
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| Self::parse_line(idx + 1, line))
            .collect()
    }

    /// Parses one record; `line_number` is 1-based and used in errors
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the record is malformed.
    pub fn parse_line(line_number: usize, line: &str) -> ParseResult<GpuMetric> {
        let fail = |reason: String| ParseError {
            line_number,
            line: line.to_string(),
            reason,
        };

        let fields: Vec<&str> = line.splitn(NUMERIC_FIELDS + 1, ',').collect();
        if fields.len() <= NUMERIC_FIELDS {
            return Err(fail(format!(
                "expected {} fields, found {}",
                NUMERIC_FIELDS + 1,
                fields.len()
            )));
        }

        let index: u32 = parse_field(fields[0], "index").map_err(&fail)?;
        let memory_used: u64 = parse_field(fields[1], "memory.used").map_err(&fail)?;
        let memory_total: u64 = parse_field(fields[2], "memory.total").map_err(&fail)?;
        let utilization: u8 = parse_field(fields[3], "utilization.gpu").map_err(&fail)?;
        let model = fields[NUMERIC_FIELDS].trim();

        if utilization > 100 {
            return Err(fail(format!("utilization {utilization} exceeds 100")));
        }
        if memory_total > 0 && memory_used > memory_total {
            return Err(fail(format!(
                "memory.used {memory_used} exceeds memory.total {memory_total}"
            )));
        }
        if model.is_empty() {
            return Err(fail("empty device name".into()));
        }

        Ok(GpuMetric {
            index,
            memory_used,
            memory_total,
            utilization,
            model: model.to_string(),
        })
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, String> {
    let value = raw.trim();
    value
        .parse()
        .map_err(|_| format!("{name} is not an integer: {value:?}"))
}
