//! `yasql list`: print query names and docs.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use yasql_core::Playbook;

/// List the queries of a playbook.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// The playbook file
    #[arg(value_name = "PLAYBOOK")]
    pub playbook: PathBuf,
}

/// Write one line per query: its name, then the first line of its doc.
pub fn write_list<W: Write>(out: &mut W, playbook: &Playbook) -> io::Result<()> {
    let width = playbook
        .queries()
        .iter()
        .map(|query| query.name().len())
        .max()
        .unwrap_or(0);
    for query in playbook.queries() {
        match query.doc().and_then(|doc| doc.lines().next()) {
            Some(doc) => writeln!(out, "{:<width$}  {doc}", query.name())?,
            None => writeln!(out, "{}", query.name())?,
        }
    }
    Ok(())
}

/// Run the command.
pub fn run(args: &Args) -> Result<()> {
    let playbook = super::load_playbook(&args.playbook)?;
    write_list(&mut io::stdout().lock(), &playbook)?;
    Ok(())
}
