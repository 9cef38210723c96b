use anyhow::{Context, Result};
use log::info;

use crate::{cli::CatArgs, io_utils, session::Session, writer};

pub fn execute(args: &CatArgs) -> Result<()> {
    let mut session = Session::load(&args.input)?;
    let table = session.build_table(&args.input.descriptors)?;

    let output_path = args.output.as_deref();
    let delimiter = io_utils::resolve_output_delimiter(output_path, args.delimiter);
    let text = writer::render_text(&table, &delimiter);
    let sink = io_utils::open_output(output_path)?;
    writer::write_text(sink, &text).with_context(|| match output_path {
        Some(path) => format!("Writing {path:?}"),
        None => "Writing to stdout".to_string(),
    })?;
    info!(
        "Wrote {} column(s) x {} row(s) to {}",
        table.len(),
        table.row_count().unwrap_or(0),
        output_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}
