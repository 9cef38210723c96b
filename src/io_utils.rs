//! I/O helpers shared by the reader, the writers and the command handlers.
//!
//! - **Layout resolution**: `.csv` inputs are comma-delimited, `.tsv` inputs
//!   tab-delimited, everything else whitespace-delimited, unless overridden.
//! - **Encoding**: inputs are decoded through `encoding_rs`, defaulting to
//!   UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    Delimited(u8),
    Whitespace,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

pub fn resolve_input_layout(path: &Path, provided: Option<u8>) -> InputLayout {
    match provided {
        Some(b' ') => InputLayout::Whitespace,
        Some(delimiter) => InputLayout::Delimited(delimiter),
        None if has_extension(path, "csv") => InputLayout::Delimited(DEFAULT_CSV_DELIMITER),
        None if has_extension(path, "tsv") => InputLayout::Delimited(DEFAULT_TSV_DELIMITER),
        None => InputLayout::Whitespace,
    }
}

/// Cell separator for text output. Cells are padded to a fixed width, so the
/// default is no separator at all.
pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>) -> String {
    if let Some(delim) = provided {
        return (delim as char).to_string();
    }
    match path {
        Some(path) if has_extension(path, "csv") => ",".to_string(),
        Some(path) if has_extension(path, "tsv") => "\t".to_string(),
        _ => String::new(),
    }
}

pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading from stdin")?;
    } else {
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .with_context(|| format!("Opening input file {path:?}"))?;
    }
    Ok(bytes)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Stdout for `None` or `-`, otherwise a freshly created file.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Creates `path`, refusing to replace an existing file unless `force`.
pub fn create_file(path: &Path, force: bool) -> Result<BufWriter<File>> {
    if !force && path.exists() {
        bail!("Refusing to overwrite existing file {path:?} (use --force)");
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Creating output file {path:?}"))?;
    Ok(BufWriter::new(file))
}

pub fn printable_delimiter(delimiter: Option<u8>) -> String {
    match delimiter {
        None => "auto".to_string(),
        Some(b',') => ",".to_string(),
        Some(b'\t') => "\\t".to_string(),
        Some(b' ') => "whitespace".to_string(),
        Some(other) => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_extension() {
        assert_eq!(
            resolve_input_layout(Path::new("data.CSV"), None),
            InputLayout::Delimited(b',')
        );
        assert_eq!(
            resolve_input_layout(Path::new("data.tsv"), None),
            InputLayout::Delimited(b'\t')
        );
        assert_eq!(
            resolve_input_layout(Path::new("data_1.txt"), None),
            InputLayout::Whitespace
        );
        assert_eq!(
            resolve_input_layout(Path::new("data.csv"), Some(b';')),
            InputLayout::Delimited(b';')
        );
    }

    #[test]
    fn output_delimiter_defaults_to_nothing() {
        assert_eq!(resolve_output_delimiter(None, None), "");
        assert_eq!(resolve_output_delimiter(Some(Path::new("out.csv")), None), ",");
        assert_eq!(resolve_output_delimiter(Some(Path::new("out.csv")), Some(b'|')), "|");
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        assert!(resolve_encoding(Some("not-a-charset")).is_err());
        assert_eq!(resolve_encoding(Some("latin1")).expect("label").name(), "windows-1252");
    }
}
