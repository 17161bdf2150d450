//! `yasql render`: print rendered queries.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use yasql_core::Playbook;
use yasql_query::{Dialect, RenderConfig, Renderer};

use crate::config::{parse_now, Settings};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `-- name` headers followed by SQL (default)
    #[default]
    Text,
    /// A JSON array of `{name, doc, sql}`
    Json,
}

/// Render queries to SQL.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// The playbook file
    #[arg(value_name = "PLAYBOOK")]
    pub playbook: PathBuf,

    /// Queries to render, comma separated (default: all)
    #[arg(short = 'q', long = "query", value_name = "NAME", value_delimiter = ',')]
    pub queries: Vec<String>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Evaluate relative dates at this local time ("YYYY-MM-DD HH:MM:SS")
    #[arg(long, value_name = "TIME")]
    pub now: Option<String>,

    /// Timezone for timestamps and the clock (IANA name)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// SQL dialect: ansi, postgres, mysql or sqlite
    #[arg(long, value_name = "DIALECT")]
    pub dialect: Option<Dialect>,
}

/// One rendered query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    /// Query name
    pub name: String,
    /// Query documentation
    pub doc: Option<String>,
    /// Terminated SQL
    pub sql: String,
}

/// Resolve the render config for a playbook from all settings layers.
pub fn resolve_config(
    playbook: &Playbook,
    rc: Option<&Path>,
    args: &Args,
) -> Result<RenderConfig> {
    let rc_settings = match rc.map(Path::to_path_buf).or_else(Settings::rc_path) {
        Some(path) => Settings::from_file(&path)?,
        None => Settings::default(),
    };
    let playbook_settings = Settings::from_document(playbook.config())?;
    let flags = Settings {
        timezone: args.timezone.clone(),
        dialect: args.dialect,
        max_passes: None,
    };
    let settings = rc_settings.overlay(playbook_settings).overlay(flags);
    debug!(?settings, "effective settings");

    let now = args.now.as_deref().map(parse_now).transpose()?;
    settings.render_config(now)
}

/// Render the named queries, or all queries when `names` is empty.
///
/// Queries render in parallel; results keep the requested order.
pub fn render_all(playbook: &Playbook, names: &[String], config: &RenderConfig) -> Result<Vec<Rendered>> {
    let queries = if names.is_empty() {
        playbook.queries().iter().collect::<Vec<_>>()
    } else {
        names
            .iter()
            .map(|name| playbook.get_query(name).with_context(|| format!("no query named `{name}`")))
            .collect::<Result<_>>()?
    };

    let renderer = Renderer::new(playbook, config);
    queries
        .par_iter()
        .map(|query| {
            let sql = renderer
                .render_query(query)
                .with_context(|| format!("failed to render `{}`", query.name()))?;
            Ok(Rendered {
                name: query.name().to_string(),
                doc: query.doc().map(str::to_string),
                sql,
            })
        })
        .collect()
}

/// Write rendered queries as text.
pub fn write_text<W: Write>(out: &mut W, rendered: &[Rendered]) -> io::Result<()> {
    for (i, query) in rendered.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "-- {}", query.name)?;
        if let Some(doc) = &query.doc {
            for line in doc.lines() {
                writeln!(out, "-- {line}")?;
            }
        }
        writeln!(out, "{}", query.sql)?;
    }
    Ok(())
}

/// Run the command.
pub fn run(args: &Args, rc: Option<&Path>) -> Result<()> {
    let playbook = super::load_playbook(&args.playbook)?;
    let config = resolve_config(&playbook, rc, args)?;
    let rendered = render_all(&playbook, &args.queries, &config)?;
    if rendered.is_empty() {
        bail!("{} has no queries", args.playbook.display());
    }
    info!(count = rendered.len(), dialect = %config.dialect, "rendered queries");

    let mut stdout = io::stdout().lock();
    match args.format {
        OutputFormat::Text => write_text(&mut stdout, &rendered)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &rendered)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
