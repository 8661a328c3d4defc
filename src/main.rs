//! packdb - create and inspect packdb database files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use packdb::storage::buffer::DEFAULT_CACHE_CAPACITY;
use packdb::{Database, DatabaseConfig, TableSchema};
use std::path::PathBuf;

/// packdb - a single-file paged record store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file
    path: PathBuf,

    /// Create the database if the file does not exist
    #[arg(short, long)]
    create: bool,

    /// Number of pages kept in the page cache
    #[arg(short = 'n', long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the file header
    Info,
    /// List every table and its columns
    Tables,
    /// Print all records of a table
    Dump {
        /// Table name
        table: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = DatabaseConfig::default().with_cache_capacity(args.cache_size);
    let opened = if args.create {
        Database::open_or_create(&args.path, config)
    } else {
        Database::open_with_config(&args.path, config)
    };
    let mut db =
        opened.with_context(|| format!("Failed to open database {}", args.path.display()))?;

    match args.command.unwrap_or(Command::Info) {
        Command::Info => print_info(&mut db)?,
        Command::Tables => {
            for schema in db.read_all_table_schemas().context("Failed to read catalog")? {
                println!("{}", describe_table(&schema));
            }
        }
        Command::Dump { table } => {
            let schema = db
                .read_table_schema_by_name(&table)
                .context("Failed to read catalog")?
                .with_context(|| format!("Table '{}' does not exist", table))?;

            for record in db.read_all_records(schema.table_id)? {
                let values: Vec<String> = record
                    .fields
                    .iter()
                    .map(|f| f.value.as_text().map_or_else(|| f.value.to_string(), str::to_owned))
                    .collect();
                println!("{}: {}", record.record_id, values.join(", "));
            }
        }
    }

    db.close().context("Failed to close database")?;
    Ok(())
}

fn print_info(db: &mut Database) -> Result<()> {
    let header = db.header().clone();
    let tables = db.read_all_table_schemas().context("Failed to read catalog")?;

    println!("File:          {}", db.path().display());
    println!("Version:       {}", header.version);
    println!("Page size:     {}", header.page_size);
    println!("Page count:    {}", header.page_count);
    println!("Schema root:   {}", header.schema_root);
    println!("Tables:        {}", tables.len());
    println!("Cache pages:   {}", db.cache().capacity());
    Ok(())
}

fn describe_table(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let null = if c.nullable { "" } else { " NOT NULL" };
            format!("{} {}{}", c.name, c.data_type, null)
        })
        .collect();
    format!("{} {} ({})", schema.table_id, schema.table_name, columns.join(", "))
}
