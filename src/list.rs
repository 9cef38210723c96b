use anyhow::Result;
use log::info;

use crate::{
    assemble::{ColumnOrigin, OutputTable},
    cli::ListArgs,
    session::Session,
    store::ColumnStore,
    table::{self, Align},
};

const HEADERS: [&str; 5] = ["#", "name", "alias", "rows", "source"];
const ALIGNS: [Align; 5] = [Align::Right, Align::Left, Align::Left, Align::Right, Align::Left];

pub fn execute(args: &ListArgs) -> Result<()> {
    let mut session = Session::load(&args.input)?;
    let table = session.build_table(&args.input.descriptors)?;
    print!("{}", render_listing(&table, session.stores()));
    info!("Listed {} column(s)", table.len());
    Ok(())
}

/// One line per output column, numbered from 1.
pub fn render_listing(table: &OutputTable, stores: &[ColumnStore]) -> String {
    let rows = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let (alias, source) = match column.origin {
                ColumnOrigin::Source { store } => {
                    let store = &stores[store];
                    (
                        store.alias().map(String::from).unwrap_or_else(|| "-".into()),
                        store.origin().to_string(),
                    )
                }
                ColumnOrigin::Derived => ("-".to_string(), "<derived>".to_string()),
            };
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                alias,
                column.values.len().to_string(),
                source,
            ]
        })
        .collect::<Vec<_>>();
    table::render_table(&HEADERS, &ALIGNS, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assemble::OutputColumn,
        store::{Column, Origin},
    };
    use std::path::PathBuf;

    #[test]
    fn listing_names_alias_and_source() {
        let stores = vec![
            ColumnStore::new(
                Origin::Path(PathBuf::from("data_1.txt")),
                Some('A'),
                vec![Column::new("time", vec![0.0, 1.0])],
            )
            .expect("store"),
        ];
        let mut output = OutputTable::new();
        output
            .place(
                OutputColumn {
                    name: "time".into(),
                    values: vec![0.0, 1.0],
                    origin: ColumnOrigin::Source { store: 0 },
                },
                |_, _| unreachable!(),
            )
            .expect("place");
        output
            .place(
                OutputColumn {
                    name: "mtime".into(),
                    values: vec![0.0, 1000.0],
                    origin: ColumnOrigin::Derived,
                },
                |_, _| unreachable!(),
            )
            .expect("place");
        let listing = render_listing(&output, &stores);
        let lines = listing.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("time") && lines[2].contains("data_1.txt"));
        assert!(lines[3].contains("mtime") && lines[3].contains("<derived>"));
    }
}
