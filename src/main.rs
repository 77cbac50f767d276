//! sqlsafe - escape a SQL action template and show how it would run

use anyhow::{anyhow, Context as _, Result};
use clap::Parser as ClapParser;
use log::info;
use serde_json::json;
use sqlsafe::sql::split_statements;
use sqlsafe::{ActionTemplate, Context, DialectId, EscaperConfig, Mode};
use std::path::PathBuf;

/// Escape a query template against a run context
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query template; read from --file when omitted
    template: Option<String>,

    /// Read the query template from a file
    #[arg(short, long, conflicts_with = "template")]
    file: Option<PathBuf>,

    /// Run context as a JSON object
    #[arg(short = 'x', long, default_value = "{}")]
    context: String,

    /// Read the run context from a JSON file
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// Query mode: gui, sql or sql-safe
    #[arg(short, long, default_value = "sql-safe")]
    mode: Mode,

    /// Target dialect (postgresql, mysql, snowflake, mssql, ...)
    #[arg(short, long)]
    dialect: Option<DialectId>,

    /// Escaper configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List every statement of the rewritten SQL
    #[arg(long)]
    split: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &args.config {
        Some(path) => EscaperConfig::from_json_file(path).context("Failed to load escaper config")?,
        None => EscaperConfig::default(),
    };

    let raw_query = match (&args.template, &args.file) {
        (Some(template), _) => template.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?,
        (None, None) => return Err(anyhow!("No template given; pass one inline or with --file")),
    };

    let context_json = match &args.context_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read context {}", path.display()))?,
        None => args.context.clone(),
    };
    let context = serde_json::from_str::<serde_json::Value>(&context_json)
        .ok()
        .and_then(Context::from_json)
        .ok_or_else(|| anyhow!("Run context must be a JSON object"))?;

    let dialect = args.dialect.unwrap_or(config.default_dialect);
    let escaper = config.escaper(Some(dialect));
    info!("Escaping template for {} in {} mode", dialect, args.mode);

    let template = ActionTemplate::new(args.mode, raw_query, context);
    let prepared = template
        .prepare(&escaper)
        .context("Failed to escape query template")?;

    let statements = if args.split {
        let sql = split_statements(&prepared.sql, *escaper.dialect())
            .context("Failed to split rewritten SQL")?;
        Some(sql.statements)
    } else {
        None
    };

    if args.json {
        let mut report = json!({
            "dialect": dialect,
            "mode": prepared.mode,
            "kind": prepared.kind,
            "exec_path": prepared.exec_path(),
            "sql": &prepared.sql,
            "params": &prepared.params,
        });
        if let Some(statements) = &statements {
            report["statements"] = statements
                .iter()
                .map(|s| json!({ "line": s.line, "kind": s.kind }))
                .collect();
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", prepared.sql);
    println!();
    println!("-- kind: {} ({} path)", prepared.kind, prepared.exec_path());
    if prepared.mode.is_safe_mode() {
        println!("-- params: {}", serde_json::to_string(&prepared.params)?);
    }
    if let Some(statements) = statements {
        for (i, statement) in statements.iter().enumerate() {
            let keyword = statement
                .keyword
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "-- statement {}: line {}, {} ({})",
                i + 1,
                statement.line,
                keyword,
                statement.kind
            );
        }
    }

    Ok(())
}
