pub mod alias;
pub mod assemble;
pub mod burst;
pub mod cat;
pub mod check;
pub mod cli;
pub mod derive;
pub mod error;
pub mod expr;
pub mod functions;
pub mod io_utils;
pub mod list;
pub mod reader;
pub mod resolve;
pub mod session;
pub mod store;
pub mod table;
pub mod writer;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::error::ThreshError;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("thresh", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Runs the command line. `Ok(false)` means a `check` condition did not hold.
pub fn run() -> Result<bool> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Cat(args) => cat::execute(&args).map(|()| true),
        Commands::List(args) => list::execute(&args).map(|()| true),
        Commands::Burst(args) => burst::execute(&args).map(|()| true),
        Commands::Check(args) => check::execute(&args),
    }
}
