use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use heapdb::{BUFFER_POOL_SIZE, ColumnType, DatabaseResult, GlobalManager};

/// Minimal disk-based relational storage engine
#[derive(Debug, Parser)]
#[command(name = "heapdb", version)]
struct Cli {
    /// Storage directory holding relation files and the catalog
    #[arg(long, default_value = "DB")]
    data_dir: PathBuf,

    /// Number of buffer pool frames
    #[arg(long, default_value_t = BUFFER_POOL_SIZE)]
    pool_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a relation, e.g. `create people int string20 float`
    Create {
        name: String,
        /// Column types: int, float or string<n>
        #[arg(required = true)]
        column_types: Vec<String>,
    },
    /// Insert one record
    Insert {
        relation: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Print every record of a relation
    Scan { relation: String },
    /// List relations
    List,
}

fn run(cli: Cli) -> DatabaseResult<()> {
    let mut db = GlobalManager::open_with_pool_size(&cli.data_dir, cli.pool_size)?;

    match cli.command {
        Command::Create { name, column_types } => {
            let types = column_types
                .iter()
                .map(|t| t.parse::<ColumnType>())
                .collect::<Result<Vec<_>, _>>()?;
            let rel = db.create_relation(&name, types.len(), &types)?;
            println!(
                "Created {} in {} (record size {}, {} slots per page)",
                rel.schema(),
                heapdb::DiskManager::file_name(rel.file_id()),
                rel.record_size(),
                rel.slot_count()
            );
        }
        Command::Insert { relation, values } => {
            let rid = db.insert_text(&relation, &values)?;
            println!("Inserted at page {} slot {}", rid.page_id.index, rid.slot_id);
        }
        Command::Scan { relation } => {
            for (_, record) in db.scan(&relation)? {
                let fields: Vec<String> = record.values().iter().map(|v| v.to_string()).collect();
                println!("{}", fields.join(" | "));
            }
        }
        Command::List => {
            for rel in db.relations() {
                println!("{}", rel.schema());
            }
        }
    }

    db.close()
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
