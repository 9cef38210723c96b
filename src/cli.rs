use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Select, alias and derive numeric columns from tabular text files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the resolved columns as a fixed-width table
    Cat(CatArgs),
    /// List the resolved columns with their alias, row count and source
    List(ListArgs),
    /// Write every resolved column to its own file
    Burst(BurstArgs),
    /// Evaluate conditions against the resolved columns; the exit code is the answer
    Check(CheckArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file, optionally aliased as `A=path`; `-` reads stdin
    #[arg(short = 'i', long = "input", action = clap::ArgAction::Append)]
    pub inputs: Vec<String>,
    /// Input delimiter (supports ',', 'tab', ';', '|', 'space'); detected from the extension when omitted
    #[arg(long = "input-delimiter", value_parser = parse_delimiter)]
    pub input_delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Seed for the random number generator used by random(), uniform() and normal()
    #[arg(long)]
    pub seed: Option<u64>,
    /// Column descriptors: `name`, `A`, `Aname`, `new=expression` or `name=None`
    #[arg(value_name = "DESCRIPTOR")]
    pub descriptors: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CatArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Separator placed between cells (none by default, ',' for .csv output)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct BurstArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Directory that receives the per-column files
    #[arg(long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
    /// Overwrite files that already exist
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Condition that must hold, such as `all(stress >= 0)`; repeatable
    #[arg(short = 'c', long = "condition", required = true, action = clap::ArgAction::Append)]
    pub conditions: Vec<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        "space" | "whitespace" | " " => Ok(b' '),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
