use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::{
    assemble::{ColumnOrigin, OutputTable},
    cli::BurstArgs,
    error::ThreshError,
    io_utils,
    session::Session,
    store::ColumnStore,
    writer,
};

pub fn execute(args: &BurstArgs) -> Result<()> {
    let mut session = Session::load(&args.input)?;
    let table = session.build_table(&args.input.descriptors)?;
    let plan = plan_files(&table, session.stores(), &args.output_dir)?;
    if let Some(existing) = plan.iter().find(|path| !args.force && path.exists()) {
        bail!("Refusing to overwrite existing file {existing:?} (use --force)");
    }
    for (column, path) in table.columns().iter().zip(&plan) {
        let sink = io_utils::create_file(path, args.force)?;
        writer::write_text(sink, &writer::render_column(column))
            .with_context(|| format!("Writing {path:?}"))?;
        debug!("Wrote column '{}' to {path:?}", column.name);
    }
    info!("Burst {} column(s) into {:?}", plan.len(), args.output_dir);
    Ok(())
}

/// Target path for every output column, in table order. Two columns that
/// would land on the same file, or a column name that is not a plain file
/// name component, are rejected before anything is written.
pub fn plan_files(
    table: &OutputTable,
    stores: &[ColumnStore],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ThreshError> {
    let fallback = stores
        .first()
        .map(|store| store.origin().basename())
        .unwrap_or_else(|| "thresh".to_string());
    let mut seen = HashSet::new();
    let mut plan = Vec::with_capacity(table.len());
    for column in table.columns() {
        if !is_plain_component(&column.name) {
            return Err(ThreshError::BurstFileName(column.name.clone()));
        }
        let basename = match column.origin {
            ColumnOrigin::Source { store } => stores[store].origin().basename(),
            ColumnOrigin::Derived => fallback.clone(),
        };
        let path = output_dir.join(format!("{basename}_{}.txt", column.name));
        if !seen.insert(path.clone()) {
            return Err(ThreshError::BurstCollision(path.display().to_string()));
        }
        plan.push(path);
    }
    Ok(plan)
}

fn is_plain_component(name: &str) -> bool {
    !name.contains(['/', '\\', '\0']) && !name.contains("..")
}
