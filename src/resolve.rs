//! Descriptor resolution.
//!
//! A descriptor names one or more columns through one of three namespaces:
//!
//! - `Alias`: a registered one-letter alias, meaning every column of that input;
//! - `Column`: a bare column name that exists in exactly one input;
//! - `Compound`: an alias immediately followed by a column name of that input.
//!
//! The namespaces are consulted in [`LOOKUP_PRIORITY`] order. A token that
//! hits more than one namespace is where alias/name collisions finally
//! surface as errors. Tokens that hit nothing and contain `=` are derived
//! columns.

use itertools::Itertools;
use log::debug;

use crate::{
    alias::AliasRegistry,
    derive::DerivedColumn,
    error::ThreshError,
    expr::Bindings,
    store::{Column, ColumnStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Alias,
    Column,
    Compound,
}

pub const LOOKUP_PRIORITY: [Namespace; 3] =
    [Namespace::Alias, Namespace::Column, Namespace::Compound];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Token(String),
    /// Every column of the store at this load index; only produced by
    /// [`expand_defaults`].
    WholeStore(usize),
}

/// With no descriptors, every column of every store is requested in load order.
pub fn expand_defaults(tokens: &[String], stores: &[ColumnStore]) -> Vec<Descriptor> {
    if tokens.is_empty() {
        (0..stores.len()).map(Descriptor::WholeStore).collect()
    } else {
        tokens.iter().cloned().map(Descriptor::Token).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub store: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Source {
        descriptor: String,
        columns: Vec<ColumnRef>,
    },
    Derived(DerivedColumn),
}

#[derive(Debug)]
enum Lookup {
    Miss,
    Unique(Vec<ColumnRef>),
    Ambiguous(Vec<usize>),
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s> {
    stores: &'s [ColumnStore],
    registry: &'s AliasRegistry,
}

impl<'s> Resolver<'s> {
    pub fn new(stores: &'s [ColumnStore], registry: &'s AliasRegistry) -> Self {
        Resolver { stores, registry }
    }

    pub fn stores(&self) -> &'s [ColumnStore] {
        self.stores
    }

    pub fn column(&self, reference: ColumnRef) -> &'s Column {
        &self.stores[reference.store].columns()[reference.column]
    }

    pub fn resolve_all(&self, descriptors: &[Descriptor]) -> Result<Vec<Resolution>, ThreshError> {
        descriptors.iter().map(|d| self.resolve(d)).collect()
    }

    pub fn resolve(&self, descriptor: &Descriptor) -> Result<Resolution, ThreshError> {
        let token = match descriptor {
            Descriptor::WholeStore(store) => {
                return Ok(Resolution::Source {
                    descriptor: self.stores[*store].label(),
                    columns: self.whole_store(*store),
                });
            }
            Descriptor::Token(token) => token,
        };
        match self.classify(token)? {
            Some(columns) => {
                debug!("Descriptor '{token}' resolved to {} column(s)", columns.len());
                Ok(Resolution::Source {
                    descriptor: token.clone(),
                    columns,
                })
            }
            None if token.contains('=') => Ok(Resolution::Derived(DerivedColumn::parse(token)?)),
            None => Err(ThreshError::UnresolvedColumn(token.clone())),
        }
    }

    /// Looks `token` up in every namespace. `Ok(None)` means no namespace
    /// knows it.
    fn classify(&self, token: &str) -> Result<Option<Vec<ColumnRef>>, ThreshError> {
        let mut hits = Vec::new();
        for namespace in LOOKUP_PRIORITY {
            match self.lookup(namespace, token) {
                Lookup::Miss => {}
                found => hits.push((namespace, found)),
            }
        }
        match hits.len() {
            0 => Ok(None),
            1 => match hits.remove(0) {
                (_, Lookup::Unique(columns)) => Ok(Some(columns)),
                (_, Lookup::Ambiguous(stores)) => Err(self.ambiguous(token, &stores)),
                (_, Lookup::Miss) => Ok(None),
            },
            _ => Err(self.collision(token, &hits)),
        }
    }

    fn lookup(&self, namespace: Namespace, token: &str) -> Lookup {
        match namespace {
            Namespace::Alias => match self.registry.lookup_token(token) {
                Some(store) => Lookup::Unique(self.whole_store(store)),
                None => Lookup::Miss,
            },
            Namespace::Column => {
                let found = self
                    .stores
                    .iter()
                    .enumerate()
                    .filter_map(|(store, s)| {
                        s.columns()
                            .iter()
                            .position(|c| c.name == token)
                            .map(|column| ColumnRef { store, column })
                    })
                    .collect::<Vec<_>>();
                match found.len() {
                    0 => Lookup::Miss,
                    1 => Lookup::Unique(found),
                    _ => Lookup::Ambiguous(found.iter().map(|r| r.store).collect()),
                }
            }
            Namespace::Compound => {
                let mut chars = token.chars();
                let (Some(first), rest) = (chars.next(), chars.as_str()) else {
                    return Lookup::Miss;
                };
                if rest.is_empty() {
                    return Lookup::Miss;
                }
                let Some(store) = self.registry.lookup(first) else {
                    return Lookup::Miss;
                };
                match self.stores[store].columns().iter().position(|c| c.name == rest) {
                    Some(column) => Lookup::Unique(vec![ColumnRef { store, column }]),
                    None => Lookup::Miss,
                }
            }
        }
    }

    fn whole_store(&self, store: usize) -> Vec<ColumnRef> {
        (0..self.stores[store].columns().len())
            .map(|column| ColumnRef { store, column })
            .collect()
    }

    fn ambiguous(&self, token: &str, stores: &[usize]) -> ThreshError {
        let labels = stores.iter().map(|&s| self.stores[s].label()).join(", ");
        let compounds = stores
            .iter()
            .filter_map(|&s| self.stores[s].alias().map(|alias| format!("{alias}{token}")))
            .collect::<Vec<_>>();
        let hint = if compounds.len() == stores.len() {
            format!("use one of {}", compounds.join(", "))
        } else {
            "give the inputs aliases (A=path) and use an alias-qualified name".to_string()
        };
        ThreshError::AmbiguousColumn {
            name: token.to_string(),
            detail: format!("present in {} inputs ({labels}); {hint}", stores.len()),
        }
    }

    fn collision(&self, token: &str, hits: &[(Namespace, Lookup)]) -> ThreshError {
        let described = hits
            .iter()
            .map(|(namespace, _)| match namespace {
                Namespace::Alias => "an alias",
                Namespace::Column => "a column name",
                Namespace::Compound => "an alias-qualified column name",
            })
            .join(" and ");
        match token.chars().next() {
            Some(alias) if hits.iter().any(|(ns, _)| *ns == Namespace::Alias) => {
                ThreshError::AliasConflict {
                    alias,
                    with: format!("column '{token}' ('{token}' is {described})"),
                }
            }
            _ => ThreshError::AmbiguousColumn {
                name: token.to_string(),
                detail: format!("matches {described}"),
            },
        }
    }

    /// Variables an expression may read from the inputs: every bare or
    /// alias-qualified name that resolves to exactly one column. Names that
    /// resolve ambiguously are recorded so referencing them explains why.
    pub fn source_bindings(&self) -> Bindings<'s> {
        let mut bindings = Bindings::new();
        for store in self.stores {
            for column in store.columns() {
                let names = std::iter::once(column.name.clone()).chain(column.compound_name());
                for name in names {
                    match self.classify(&name) {
                        Ok(Some(refs)) if refs.len() == 1 => {
                            bindings.bind(name, &self.column(refs[0]).values);
                        }
                        Ok(_) => {}
                        Err(err) => bindings.mark_ambiguous(name, err.to_string()),
                    }
                }
            }
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Origin;

    fn store(alias: Option<char>, names: &[&str], rows: usize) -> ColumnStore {
        let columns = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                Column::new(*name, (0..rows).map(|r| (idx * 10 + r) as f64).collect())
            })
            .collect();
        ColumnStore::new(Origin::Synthetic, alias, columns).expect("store")
    }

    fn token(text: &str) -> Descriptor {
        Descriptor::Token(text.to_string())
    }

    #[test]
    fn lookup_priority_is_alias_then_column_then_compound() {
        assert_eq!(
            LOOKUP_PRIORITY,
            [Namespace::Alias, Namespace::Column, Namespace::Compound]
        );
    }

    #[test]
    fn defaults_expand_to_every_store() {
        let stores = vec![store(None, &["a"], 1), store(None, &["b"], 1)];
        assert_eq!(
            expand_defaults(&[], &stores),
            vec![Descriptor::WholeStore(0), Descriptor::WholeStore(1)]
        );
        assert_eq!(
            expand_defaults(&["a".to_string()], &stores),
            vec![token("a")]
        );
    }

    #[test]
    fn alias_alone_means_whole_store() {
        let stores = vec![store(Some('A'), &["time", "strain", "stress"], 2)];
        let registry = AliasRegistry::from_stores(&stores).expect("registry");
        let resolver = Resolver::new(&stores, &registry);
        let Resolution::Source { columns, .. } = resolver.resolve(&token("A")).expect("resolve")
        else {
            panic!("expected source columns");
        };
        let names = columns
            .iter()
            .map(|r| resolver.column(*r).name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["time", "strain", "stress"]);
    }

    #[test]
    fn duplicated_names_need_an_alias() {
        let stores = vec![
            store(Some('A'), &["time", "strain"], 2),
            store(Some('B'), &["time", "density"], 2),
        ];
        let registry = AliasRegistry::from_stores(&stores).expect("registry");
        let resolver = Resolver::new(&stores, &registry);
        let err = resolver.resolve(&token("time")).unwrap_err();
        assert!(matches!(err, ThreshError::AmbiguousColumn { .. }));
        assert!(err.to_string().contains("Atime, Btime"));

        for (compound, store_idx) in [("Atime", 0), ("Btime", 1)] {
            let resolution = resolver.resolve(&token(compound)).expect("compound");
            assert_eq!(
                resolution,
                Resolution::Source {
                    descriptor: compound.to_string(),
                    columns: vec![ColumnRef {
                        store: store_idx,
                        column: 0
                    }],
                }
            );
        }
    }

    #[test]
    fn unused_alias_collisions_are_tolerated() {
        let stores = vec![store(Some('a'), &["a", "b"], 2)];
        let registry = AliasRegistry::from_stores(&stores).expect("registry");
        let resolver = Resolver::new(&stores, &registry);
        assert!(resolver.resolve(&token("b")).is_ok());
        let err = resolver.resolve(&token("a")).unwrap_err();
        assert!(matches!(err, ThreshError::AliasConflict { alias: 'a', .. }));
    }

    #[test]
    fn column_and_compound_hits_are_ambiguous() {
        let stores = vec![
            store(Some('A'), &["time", "strain"], 2),
            store(None, &["Atime"], 2),
        ];
        let registry = AliasRegistry::from_stores(&stores).expect("registry");
        let resolver = Resolver::new(&stores, &registry);
        let err = resolver.resolve(&token("Atime")).unwrap_err();
        assert_eq!(
            err,
            ThreshError::AmbiguousColumn {
                name: "Atime".into(),
                detail: "matches a column name and an alias-qualified column name".into(),
            }
        );
        assert!(resolver.resolve(&token("Astrain")).is_ok());

        let bindings = resolver.source_bindings();
        assert!(bindings.get("Atime").is_none());
        assert!(bindings.get("time").is_some());
        assert!(bindings.get("Astrain").is_some());
    }

    #[test]
    fn unknown_tokens_without_equals_are_unresolved() {
        let stores = vec![store(None, &["a"], 1)];
        let registry = AliasRegistry::new();
        let resolver = Resolver::new(&stores, &registry);
        assert_eq!(
            resolver.resolve(&token("zeta")),
            Err(ThreshError::UnresolvedColumn("zeta".into()))
        );
        assert!(matches!(
            resolver.resolve(&token("zeta=2*a")),
            Ok(Resolution::Derived(_))
        ));
    }

    #[test]
    fn bindings_skip_ambiguous_names_but_keep_compounds() {
        let stores = vec![
            store(Some('A'), &["time", "strain"], 2),
            store(None, &["time", "density"], 2),
        ];
        let registry = AliasRegistry::from_stores(&stores).expect("registry");
        let resolver = Resolver::new(&stores, &registry);
        let bindings = resolver.source_bindings();
        assert!(bindings.get("time").is_none());
        assert!(bindings.get("Atime").is_some());
        assert!(bindings.get("strain").is_some());
        assert!(bindings.get("density").is_some());
    }
}
