//! Loading column stores from delimited text.
//!
//! The first line that is neither blank nor a `#` comment holds the column
//! names; every following data line holds one numeric value per column.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    alias::InputSpec,
    io_utils::{self, InputLayout},
    store::{Column, ColumnStore, Origin},
};

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Overrides layout detection; `b' '` forces whitespace splitting.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            delimiter: None,
            encoding: encoding_rs::UTF_8,
        }
    }
}

pub fn load_store(spec: &InputSpec, options: &ReadOptions) -> Result<ColumnStore> {
    let origin = if io_utils::is_dash(&spec.path) {
        Origin::Stdin
    } else {
        Origin::Path(spec.path.clone())
    };
    let bytes = io_utils::read_input(&spec.path)?;
    let text = io_utils::decode_bytes(&bytes, options.encoding)
        .with_context(|| format!("Decoding {origin}"))?;
    let layout = io_utils::resolve_input_layout(&spec.path, options.delimiter);
    debug!("Reading {origin} as {layout:?}");
    let store = parse_text(&text, layout, origin, spec.alias)?;
    info!(
        "Loaded {} column(s) x {} row(s) from {}",
        store.columns().len(),
        store.row_count(),
        store.label()
    );
    Ok(store)
}

pub fn parse_text(
    text: &str,
    layout: InputLayout,
    origin: Origin,
    alias: Option<char>,
) -> Result<ColumnStore> {
    let (headers, rows) = match layout {
        InputLayout::Whitespace => split_whitespace(text),
        InputLayout::Delimited(delimiter) => split_delimited(text, delimiter),
    }
    .with_context(|| format!("Reading {origin}"))?;

    let mut values = vec![Vec::with_capacity(rows.len()); headers.len()];
    for (line, fields) in &rows {
        if fields.len() != headers.len() {
            bail!(
                "{origin}, line {line}: expected {} field(s) but found {}",
                headers.len(),
                fields.len()
            );
        }
        for ((field, header), column) in fields.iter().zip(&headers).zip(values.iter_mut()) {
            column.push(parse_number(field).ok_or_else(|| {
                anyhow!("{origin}, line {line}, column '{header}': '{field}' is not a number")
            })?);
        }
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    ColumnStore::new(origin.clone(), alias, columns).with_context(|| format!("Reading {origin}"))
}

type Rows = Vec<(u64, Vec<String>)>;

fn is_skipped(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn split_whitespace(text: &str) -> Result<(Vec<String>, Rows)> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx as u64 + 1, line))
        .filter(|(_, line)| !is_skipped(line));
    let (_, header) = lines.next().ok_or_else(|| anyhow!("no header row found"))?;
    let headers = header.split_whitespace().map(str::to_string).collect();
    let rows = lines
        .map(|(line, text)| (line, text.split_whitespace().map(str::to_string).collect()))
        .collect();
    Ok((headers, rows))
}

fn split_delimited(text: &str, delimiter: u8) -> Result<(Vec<String>, Rows)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut headers = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed delimited record")?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let fields = record.iter().map(str::to_string).collect::<Vec<_>>();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        if headers.is_none() {
            headers = Some(fields);
        } else {
            rows.push((line, fields));
        }
    }
    let headers = headers.ok_or_else(|| anyhow!("no header row found"))?;
    Ok((headers, rows))
}

/// Accepts the usual decimal and exponent forms plus `inf`/`nan`.
fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok()
}

/// Loads a store straight from a file path, used by tests and benches.
pub fn load_path(path: &Path, alias: Option<char>) -> Result<ColumnStore> {
    load_store(
        &InputSpec {
            alias,
            path: path.to_path_buf(),
        },
        &ReadOptions::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThreshError;

    const DATA_1: &str = "\
time strain stress
0.0  0.00   0.0
1.0  0.01   5.0
# a comment line
2.0  0.02   9.0

3.0  0.03  12.0
4.0  0.04  14.0
";

    #[test]
    fn whitespace_layout_skips_comments_and_blanks() {
        let store = parse_text(DATA_1, InputLayout::Whitespace, Origin::Synthetic, Some('A'))
            .expect("parse");
        assert_eq!(
            store.column_names().collect::<Vec<_>>(),
            vec!["time", "strain", "stress"]
        );
        assert_eq!(store.row_count(), 5);
        assert_eq!(store.column("stress").map(|c| c.values[4]), Some(14.0));
    }

    #[test]
    fn csv_layout_trims_fields() {
        let text = "time, density\n1, 2.5\n2, 3.5e0\n";
        let store = parse_text(text, InputLayout::Delimited(b','), Origin::Synthetic, None)
            .expect("parse");
        assert_eq!(store.column("density").map(|c| c.values.clone()), Some(vec![2.5, 3.5]));
    }

    #[test]
    fn short_rows_report_their_line() {
        let text = "a b\n1 2\n3\n";
        let err = parse_text(text, InputLayout::Whitespace, Origin::Synthetic, None).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"), "{err:#}");
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        let text = "a b\n1 x\n";
        let err = parse_text(text, InputLayout::Whitespace, Origin::Synthetic, None).unwrap_err();
        assert!(format!("{err:#}").contains("'x' is not a number"), "{err:#}");
    }

    #[test]
    fn duplicate_headers_surface_as_thresh_errors() {
        let text = "a a\n1 2\n";
        let err = parse_text(text, InputLayout::Whitespace, Origin::Synthetic, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ThreshError>(),
            Some(&ThreshError::DuplicateHeader("a".into()))
        );
    }

    #[test]
    fn header_only_gives_empty_columns() {
        let store = parse_text("a b\n", InputLayout::Whitespace, Origin::Synthetic, None)
            .expect("parse");
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.columns().len(), 2);
    }

    #[test]
    fn empty_input_has_no_header() {
        let result = parse_text("# only\n", InputLayout::Whitespace, Origin::Synthetic, None);
        assert!(result.is_err());
    }
}
