use anyhow::Result;
use log::info;

use crate::{cli::CheckArgs, session::Session};

/// Returns whether every condition held. Every condition is evaluated so
/// that an invalid one is reported even after an earlier one failed.
pub fn execute(args: &CheckArgs) -> Result<bool> {
    let mut session = Session::load(&args.input)?;
    let table = session.build_table(&args.input.descriptors)?;
    let mut all_held = true;
    for condition in &args.conditions {
        let held = session.check(&table, condition)?;
        if !held {
            info!("Condition '{condition}' does not hold");
        }
        all_held &= held;
    }
    info!(
        "Checked {} condition(s); {}",
        args.conditions.len(),
        if all_held { "all hold" } else { "at least one failed" }
    );
    Ok(all_held)
}
