//! Two-column waveform exports from oscilloscopes and data loggers.

use crate::signal::Waveform;
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    Char(u8),
    /// Any run of spaces or tabs
    Whitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Milliseconds => value / 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformFormat {
    pub delimiter: Delimiter,
    pub has_header: bool,
    /// Numbers use `,` as the decimal separator
    pub decimal_comma: bool,
    pub time_column: usize,
    pub voltage_column: usize,
    pub time_unit: TimeUnit,
    /// Drop samples before this time (seconds, after unit conversion)
    pub start_time: Option<f64>,
    /// Shift the time axis so the first kept sample is at zero
    pub rezero: bool,
}

impl Default for WaveformFormat {
    fn default() -> Self {
        Self::oscilloscope_csv()
    }
}

impl WaveformFormat {
    /// Comma-separated trace with a header row, time in seconds.
    pub fn oscilloscope_csv() -> Self {
        Self {
            delimiter: Delimiter::Char(b','),
            has_header: true,
            decimal_comma: false,
            time_column: 0,
            voltage_column: 1,
            time_unit: TimeUnit::Seconds,
            start_time: None,
            rezero: false,
        }
    }

    /// Whitespace-separated logger export: no header, decimal commas, time in
    /// milliseconds, the first 500 ms dropped as start-up noise.
    pub fn logger_export() -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            has_header: false,
            decimal_comma: true,
            time_column: 0,
            voltage_column: 1,
            time_unit: TimeUnit::Milliseconds,
            start_time: Some(0.5),
            rezero: true,
        }
    }

    fn parse_number(&self, field: &str) -> Option<f64> {
        let field = field.trim();
        let value = if self.decimal_comma {
            field.replace(',', ".").parse::<f64>()
        } else {
            field.parse::<f64>()
        };
        value.ok().filter(|v| v.is_finite())
    }
}

/// Parse a waveform export. Rows whose time or voltage field is not a number
/// are skipped.
pub fn parse_waveform(text: &str, format: &WaveformFormat) -> Result<Waveform> {
    if format.decimal_comma && format.delimiter == Delimiter::Char(b',') {
        bail!("decimal commas need a delimiter other than ','");
    }
    let rows = match format.delimiter {
        Delimiter::Whitespace => split_whitespace_rows(text, format.has_header),
        Delimiter::Char(delimiter) => split_delimited_rows(text, delimiter, format.has_header)?,
    };

    let mut time = Vec::with_capacity(rows.len());
    let mut voltage = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in &rows {
        let t = row
            .get(format.time_column)
            .and_then(|f| format.parse_number(f));
        let v = row
            .get(format.voltage_column)
            .and_then(|f| format.parse_number(f));
        match (t, v) {
            (Some(t), Some(v)) => {
                time.push(format.time_unit.to_seconds(t));
                voltage.push(v);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("skipped {} non-numeric rows", skipped);
    }

    if let Some(start) = format.start_time {
        (time, voltage) = time
            .into_iter()
            .zip(voltage)
            .filter(|(t, _)| *t >= start)
            .unzip();
    }
    if time.is_empty() {
        bail!("no numeric samples found");
    }
    if format.rezero {
        let origin = time[0];
        time.iter_mut().for_each(|t| *t -= origin);
    }
    Ok(Waveform::new(time, voltage)?)
}

pub fn read_waveform(path: &Path, format: &WaveformFormat) -> Result<Waveform> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_waveform(&text, format).with_context(|| format!("parsing {}", path.display()))
}

fn split_whitespace_rows(text: &str, has_header: bool) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .skip(usize::from(has_header))
        .map(|line| line.split_whitespace().map(str::to_owned).collect())
        .collect()
}

fn split_delimited_rows(text: &str, delimiter: u8, has_header: bool) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading record {}", idx + 1))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}
