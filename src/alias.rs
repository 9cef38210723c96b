//! One-letter aliases for input files.
//!
//! Input tokens take the form `[ALIAS=]PATH`. The registry maps each alias to
//! the load index of its store. Collisions between an alias and a column name
//! are deliberately tolerated here; they only become an error when a
//! descriptor actually lands on the collision (see `resolve`).

use std::{collections::BTreeMap, path::PathBuf};

use crate::{error::ThreshError, store::ColumnStore};

/// Parses an alias token, which must be exactly one ASCII letter.
pub fn parse_alias(token: &str) -> Result<char, ThreshError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii_alphabetic() => Ok(ch),
        _ => Err(ThreshError::InvalidAlias(token.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub alias: Option<char>,
    pub path: PathBuf,
}

impl InputSpec {
    /// Splits `A=data.txt` into alias and path. A token naming an existing file
    /// is taken literally even when it contains `=`.
    pub fn parse(token: &str) -> Result<Self, ThreshError> {
        let literal = PathBuf::from(token);
        if token == "-" || literal.is_file() {
            return Ok(InputSpec {
                alias: None,
                path: literal,
            });
        }
        match token.split_once('=') {
            Some((alias, path)) if !alias.is_empty() => {
                let alias = parse_alias(alias)?;
                if path.is_empty() {
                    return Err(ThreshError::InvalidDescriptor {
                        descriptor: token.to_string(),
                        reason: "alias is missing a path".to_string(),
                    });
                }
                Ok(InputSpec {
                    alias: Some(alias),
                    path: PathBuf::from(path),
                })
            }
            _ => Ok(InputSpec {
                alias: None,
                path: literal,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    entries: BTreeMap<char, usize>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from the aliases carried by loaded stores.
    pub fn from_stores(stores: &[ColumnStore]) -> Result<Self, ThreshError> {
        let mut registry = AliasRegistry::new();
        for (idx, store) in stores.iter().enumerate() {
            if let Some(alias) = store.alias() {
                registry.register(alias, idx)?;
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, alias: char, store: usize) -> Result<(), ThreshError> {
        if !alias.is_ascii_alphabetic() {
            return Err(ThreshError::InvalidAlias(alias.to_string()));
        }
        match self.entries.get(&alias) {
            Some(&existing) if existing != store => Err(ThreshError::AliasConflict {
                alias,
                with: format!("another input (#{})", existing + 1),
            }),
            _ => {
                self.entries.insert(alias, store);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, alias: char) -> Option<usize> {
        self.entries.get(&alias).copied()
    }

    /// Store index for a descriptor that is exactly an alias.
    pub fn lookup_token(&self, token: &str) -> Option<usize> {
        parse_alias(token).ok().and_then(|alias| self.lookup(alias))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, usize)> + '_ {
        self.entries.iter().map(|(alias, store)| (*alias, *store))
    }

    /// Aliases that are also spelled like a column name somewhere.
    pub fn collisions(&self, stores: &[ColumnStore]) -> Vec<String> {
        let mut found = Vec::new();
        for (alias, _) in self.iter() {
            let spelled = alias.to_string();
            if stores.iter().any(|store| store.contains(&spelled)) {
                found.push(spelled);
            }
        }
        found
    }
}
