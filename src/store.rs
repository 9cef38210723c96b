//! In-memory column stores.
//!
//! A [`ColumnStore`] holds everything loaded from one input: its origin, the
//! optional one-letter alias, and an ordered set of equally long numeric
//! columns with unique names.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::error::ThreshError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub alias: Option<char>,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column {
            name: name.into(),
            alias: None,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Alias-qualified name (`Atime`), if the owning store has an alias.
    pub fn compound_name(&self) -> Option<String> {
        self.alias.map(|alias| format!("{alias}{}", self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Path(PathBuf),
    Stdin,
    Synthetic,
}

impl Origin {
    /// Stem used when naming burst files.
    pub fn basename(&self) -> String {
        match self {
            Origin::Path(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "thresh".to_string()),
            Origin::Stdin => "stdin".to_string(),
            Origin::Synthetic => "thresh".to_string(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Origin::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Path(path) => write!(f, "{}", path.display()),
            Origin::Stdin => f.write_str("-"),
            Origin::Synthetic => f.write_str("<synthetic>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStore {
    origin: Origin,
    alias: Option<char>,
    columns: Vec<Column>,
}

impl ColumnStore {
    /// Builds a store, enforcing unique names and a rectangular shape.
    pub fn new(
        origin: Origin,
        alias: Option<char>,
        mut columns: Vec<Column>,
    ) -> Result<Self, ThreshError> {
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(ThreshError::DuplicateHeader(column.name.clone()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(ragged) = columns.iter().find(|c| c.len() != expected) {
                return Err(ThreshError::RaggedColumns {
                    name: ragged.name.clone(),
                    expected,
                    actual: ragged.len(),
                });
            }
        }
        for column in &mut columns {
            column.alias = alias;
        }
        Ok(ColumnStore {
            origin,
            alias,
            columns,
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn alias(&self) -> Option<char> {
        self.alias
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Human-readable label used in log lines and error messages.
    pub fn label(&self) -> String {
        match self.alias {
            Some(alias) => format!("{alias}={}", self.origin),
            None => self.origin.to_string(),
        }
    }
}
