use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use searchtrack::config::Config;
use searchtrack::db::Db;
use tracing_subscriber::EnvFilter;

/// SearchTrack - track search queries, collected results, and their audit trail
#[derive(Parser)]
#[command(name = "searchtrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "")]
    config: String,

    /// Override the database path
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new search query
    #[command(alias = "s")]
    Submit {
        /// Search criteria text
        #[arg(required = true)]
        criteria: Vec<String>,

        /// Owning user id
        #[arg(long)]
        user: Option<i64>,
    },

    /// List tracked queries, most recent first
    #[command(alias = "ls", alias = "l")]
    List,

    /// Show one query as JSON
    Show {
        /// Query id
        id: i64,
    },

    /// Print the structured results collected for a query
    #[command(alias = "r")]
    Results {
        /// Query id
        id: i64,
    },

    /// Print the audit log of a query
    Logs {
        /// Query id
        id: i64,
    },

    /// Update the processing status of a query
    Status {
        /// Query id
        id: i64,
        /// New status, e.g. pending, processing, completed, error
        value: String,
    },

    /// Delete a query and everything collected for it
    #[command(alias = "rm")]
    Delete {
        /// Query id
        id: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }
    config.validate()?;

    let db = Db::open(&config.db_path).context("failed to open database")?;

    match cli.command {
        Commands::Submit { criteria, user } => {
            let criteria = criteria.join(" ");
            let id = db.insert_query(&criteria, user)?;
            db.append_log(id, "search query recorded")?;
            println!("{id}");
        }
        Commands::List => {
            for query in db.list_queries()?.into_iter().take(config.list_limit) {
                println!(
                    "{:>6}  {:<10}  {}  {}",
                    query.id,
                    query.status,
                    query.created_at.format("%Y-%m-%d %H:%M:%S"),
                    query.criteria
                );
            }
        }
        Commands::Show { id } => match db.get_query(id)? {
            Some(query) => println!("{}", serde_json::to_string_pretty(&query)?),
            None => bail!("no query with id {id}"),
        },
        Commands::Results { id } => {
            for payload in db.structured_payloads_for_query(id)? {
                println!("{}", serde_json::to_string(&payload)?);
            }
        }
        Commands::Logs { id } => {
            for entry in db.logs_for_query(id)? {
                println!(
                    "{}  {}",
                    entry.log_time.format("%Y-%m-%d %H:%M:%S"),
                    entry.log_msg.unwrap_or_default()
                );
            }
        }
        Commands::Status { id, value } => {
            if !db.update_status(id, &value)? {
                bail!("no query with id {id}");
            }
            db.append_log(id, &format!("status changed to {value}"))?;
        }
        Commands::Delete { id } => {
            if !db.delete_query(id)? {
                bail!("no query with id {id}");
            }
            println!("deleted query {id}");
        }
    }

    Ok(())
}
