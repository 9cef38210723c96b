//! Output assembly.
//!
//! Resolutions are applied left to right onto an [`OutputTable`]. The first
//! placement of a name fixes its position; later placements of the same name
//! replace the values in place.

use log::{debug, warn};
use rand::rngs::StdRng;

use crate::{
    derive::DerivedColumn,
    error::ThreshError,
    expr::Bindings,
    resolve::{Resolution, Resolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// Copied from the store at this load index.
    Source { store: usize },
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub values: Vec<f64>,
    pub origin: ColumnOrigin,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputTable {
    columns: Vec<OutputColumn>,
}

impl OutputTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Rows shared by the current columns, `None` for an empty table.
    pub fn row_count(&self) -> Option<usize> {
        self.columns.first().map(|c| c.values.len())
    }

    /// Row count of every column except `name`.
    pub fn row_count_excluding(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.name != name)
            .map(|c| c.values.len())
    }

    /// Appends `column`, or replaces the same-named column in place.
    ///
    /// The caller supplies the error to raise when the length does not match
    /// the rest of the table.
    pub fn place(
        &mut self,
        column: OutputColumn,
        mismatch: impl FnOnce(usize, usize) -> ThreshError,
    ) -> Result<(), ThreshError> {
        if let Some(expected) = self.row_count_excluding(&column.name) {
            if expected != column.values.len() {
                return Err(mismatch(expected, column.values.len()));
            }
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => {
                warn!("Overwriting existing column '{}'", column.name);
                *existing = column;
            }
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<OutputColumn, ThreshError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ThreshError::RemoveMissing(name.to_string()))?;
        warn!("Removing column '{name}'");
        Ok(self.columns.remove(idx))
    }

    /// Binds every output column by name, shadowing earlier bindings.
    pub fn bind_into<'t>(&'t self, bindings: &mut Bindings<'t>) {
        for column in &self.columns {
            bindings.bind(column.name.clone(), &column.values);
        }
    }
}

/// Variables visible to conditions and expressions once `table` is built:
/// the unambiguous input columns overlaid by the output columns.
pub fn table_bindings<'a>(table: &'a OutputTable, resolver: &Resolver<'a>) -> Bindings<'a> {
    let mut bindings = resolver.source_bindings();
    table.bind_into(&mut bindings);
    bindings
}

pub fn assemble(
    resolutions: &[Resolution],
    resolver: &Resolver<'_>,
    rng: &mut StdRng,
) -> Result<OutputTable, ThreshError> {
    let sources = resolver.source_bindings();
    let mut table = OutputTable::new();
    for resolution in resolutions {
        match resolution {
            Resolution::Source {
                descriptor,
                columns,
            } => {
                debug!("Placing {} column(s) for '{descriptor}'", columns.len());
                for reference in columns {
                    let column = resolver.column(*reference);
                    let store = &resolver.stores()[reference.store];
                    let placed = OutputColumn {
                        name: column.name.clone(),
                        values: column.values.clone(),
                        origin: ColumnOrigin::Source {
                            store: reference.store,
                        },
                    };
                    table.place(placed, |expected, actual| ThreshError::RowCountMismatch {
                        name: column.name.clone(),
                        source_label: store.label(),
                        expected,
                        actual,
                    })?;
                }
            }
            Resolution::Derived(derived) => apply_derived(&mut table, derived, &sources, rng)?,
        }
    }
    Ok(table)
}

fn apply_derived(
    table: &mut OutputTable,
    derived: &DerivedColumn,
    sources: &Bindings<'_>,
    rng: &mut StdRng,
) -> Result<(), ThreshError> {
    let value = {
        let mut bindings = sources.clone();
        table.bind_into(&mut bindings);
        derived.evaluate(&bindings, rng)?
    };
    let Some(value) = value else {
        table.remove(&derived.name)?;
        return Ok(());
    };
    debug!("Derived column '{}' evaluated to {value}", derived.name);
    let values = value.into_column(table.row_count());
    let name = derived.name.clone();
    table.place(
        OutputColumn {
            name: derived.name.clone(),
            values,
            origin: ColumnOrigin::Derived,
        },
        |expected, actual| ThreshError::LengthMismatch {
            name,
            expected,
            actual,
        },
    )
}
