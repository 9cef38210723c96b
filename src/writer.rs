//! Fixed-width text rendering of an output table.
//!
//! Every cell is right-aligned in [`CELL_WIDTH`] characters. Values use
//! scientific notation with [`DECIMALS`] fractional digits, an explicit sign
//! and an exponent of at least two digits, e.g. `+1.00000000000000e+00`.

use std::{fmt::Write as _, io::Write};

use anyhow::{Context, Result};

use crate::assemble::{OutputColumn, OutputTable};

pub const CELL_WIDTH: usize = 23;
pub const DECIMALS: usize = CELL_WIDTH - 9;

pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "+nan".to_string();
    }
    let sign = if value.is_sign_negative() { '-' } else { '+' };
    if value.is_infinite() {
        return format!("{sign}inf");
    }
    let formatted = format!("{:.*e}", DECIMALS, value.abs());
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let exponent = exponent.parse::<i32>().unwrap_or(0);
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.unsigned_abs())
}

fn header_line(columns: &[OutputColumn], delimiter: &str) -> String {
    columns
        .iter()
        .map(|c| format!("{:>CELL_WIDTH$}", c.name))
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Renders the header line followed by one line per row. An empty table
/// renders as nothing.
pub fn render_text(table: &OutputTable, delimiter: &str) -> String {
    let columns = table.columns();
    if columns.is_empty() {
        return String::new();
    }
    let mut output = header_line(columns, delimiter);
    output.push('\n');
    for row in 0..table.row_count().unwrap_or(0) {
        let mut first = true;
        for column in columns {
            if !first {
                output.push_str(delimiter);
            }
            first = false;
            let _ = write!(output, "{:>CELL_WIDTH$}", format_value(column.values[row]));
        }
        output.push('\n');
    }
    output
}

/// Renders a single column in the same layout, used for burst files.
pub fn render_column(column: &OutputColumn) -> String {
    let mut output = format!("{:>CELL_WIDTH$}\n", column.name);
    for value in &column.values {
        let _ = writeln!(output, "{:>CELL_WIDTH$}", format_value(*value));
    }
    output
}

pub fn write_text<W: Write>(mut sink: W, text: &str) -> Result<()> {
    sink.write_all(text.as_bytes()).context("Writing output")?;
    sink.flush().context("Flushing output")
}
