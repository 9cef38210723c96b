//! The batch pipeline shared by every subcommand: load inputs, build the
//! alias registry, resolve descriptors and assemble the output table.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    alias::{AliasRegistry, InputSpec},
    assemble::{self, OutputTable},
    cli::InputArgs,
    expr,
    io_utils,
    reader::{self, ReadOptions},
    resolve::{Resolver, expand_defaults},
    store::ColumnStore,
};

pub struct Session {
    stores: Vec<ColumnStore>,
    registry: AliasRegistry,
    rng: StdRng,
}

impl Session {
    pub fn load(args: &InputArgs) -> Result<Self> {
        let options = ReadOptions {
            delimiter: args.input_delimiter,
            encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        };
        info!(
            "Loading {} input(s) with delimiter '{}'",
            args.inputs.len(),
            io_utils::printable_delimiter(args.input_delimiter)
        );
        let specs = args
            .inputs
            .iter()
            .map(|token| InputSpec::parse(token).with_context(|| format!("Parsing input '{token}'")))
            .collect::<Result<Vec<_>>>()?;
        if specs.iter().filter(|s| io_utils::is_dash(&s.path)).count() > 1 {
            bail!("stdin ('-') can only be read once");
        }
        let stores = specs
            .iter()
            .map(|spec| reader::load_store(spec, &options))
            .collect::<Result<Vec<_>>>()?;
        Self::from_stores(stores, args.seed)
    }

    pub fn from_stores(stores: Vec<ColumnStore>, seed: Option<u64>) -> Result<Self> {
        let registry = AliasRegistry::from_stores(&stores).context("Registering aliases")?;
        for collision in registry.collisions(&stores) {
            debug!("Alias '{collision}' is also a column name; it is ambiguous when used alone");
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Session {
            stores,
            registry,
            rng,
        })
    }

    pub fn stores(&self) -> &[ColumnStore] {
        &self.stores
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.stores, &self.registry)
    }

    pub fn build_table(&mut self, descriptors: &[String]) -> Result<OutputTable> {
        let resolver = Resolver::new(&self.stores, &self.registry);
        let expanded = expand_defaults(descriptors, &self.stores);
        debug!("Resolving {} descriptor(s)", expanded.len());
        let resolutions = resolver
            .resolve_all(&expanded)
            .context("Resolving column descriptors")?;
        let table = assemble::assemble(&resolutions, &resolver, &mut self.rng)
            .context("Assembling output columns")?;
        if table.is_empty() {
            warn!("No columns left to output");
        }
        Ok(table)
    }

    /// Evaluates `condition` against the inputs and the assembled table.
    pub fn check(&mut self, table: &OutputTable, condition: &str) -> Result<bool> {
        let resolver = Resolver::new(&self.stores, &self.registry);
        let bindings = assemble::table_bindings(table, &resolver);
        let value = expr::evaluate(condition, &bindings, &mut self.rng)
            .with_context(|| format!("Checking condition '{condition}'"))?;
        debug!("Condition '{condition}' evaluated to {value}");
        Ok(value.truthy())
    }
}
