use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use contact_book::config::Config;
use contact_book::contact::{ContactDraft, SortDirection, SortField, SortState};
use contact_book::controller::ContactBook;
use contact_book::shell::{self, format_contacts};
use contact_book::store::StoreMode;
use contact_book::web;

const DEFAULT_CONFIG: &str = "contact-book.yaml";

#[derive(Parser, Debug)]
#[command(name = "contact-book")]
#[command(version)]
#[command(about = "A contact list backed by local storage or a remote REST API")]
struct Args {
    /// Path to config file (defaults to ./contact-book.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured store: local or remote
    #[arg(short, long)]
    mode: Option<StoreMode>,

    /// Print an example config and exit
    #[arg(long)]
    generate_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show contacts
    List {
        /// Only show contacts matching this text
        #[arg(short, long)]
        query: Option<String>,
        /// name, phone, email, notes or created
        #[arg(short, long)]
        sort: Option<SortField>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Create a contact
    Add {
        name: String,
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Replace a contact's fields
    Edit {
        id: String,
        name: String,
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a contact
    Delete { id: String },
    /// Delete every contact in the active store
    Clear,
    /// Import contacts from a JSON file
    Import { path: PathBuf },
    /// Export contacts as JSON (stdout without a path)
    Export { path: Option<PathBuf> },
    /// Check the remote API
    Health,
    /// Interactive shell with runtime mode switching
    Shell,
    /// Serve the contacts REST API over the local store
    Serve,
}

const EXAMPLE_CONFIG: &str = include_str!("../example-config.yaml");

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(&path.to_string_lossy()),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.generate_config {
        println!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.mode = mode;
        config.validate()?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.min_level.to_ascii_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {} v{}", contact_book::NAME, contact_book::VERSION);

    let command = args.command.unwrap_or(Command::List {
        query: None,
        sort: None,
        desc: false,
    });

    if let Command::Serve = command {
        let store = Arc::new(config.local_store());
        let addr = config.server.addr();
        tokio::select! {
            _ = web::serve(addr, store) => {
                info!("Server task ended");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
            }
        }
        return Ok(());
    }

    let mut book = ContactBook::new(config.local_store(), config.remote_store()?);

    if let Command::Shell = command {
        if let Err(e) = book.set_mode(config.mode).await {
            error!("Failed to load contacts: {}", e);
        }
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        return shell::run(&mut book, stdin, &mut std::io::stdout()).await;
    }

    book.set_mode(config.mode).await?;

    match command {
        Command::List { query, sort, desc } => {
            if let Some(query) = query {
                book.set_search(query).await?;
            }
            if let Some(field) = sort {
                let direction = if desc {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                book.set_sort(SortState::new(field, direction));
            }
            print!("{}", format_contacts(&book.visible()));
        }
        Command::Add { name, phone, email, notes } => {
            let draft = ContactDraft { name, phone, email, notes };
            book.submit(&draft, None).await?;
            println!("Saved ({} contacts)", book.contacts().len());
        }
        Command::Edit { id, name, phone, email, notes } => {
            let draft = ContactDraft { name, phone, email, notes };
            book.submit(&draft, Some(&id)).await?;
            println!("Updated {}", id);
        }
        Command::Delete { id } => {
            book.delete(&id).await?;
            println!("Deleted {}", id);
        }
        Command::Clear => {
            let report = book.clear_all().await?;
            println!("Deleted {} contacts", report.deleted);
            for (id, reason) in &report.failed {
                eprintln!("  failed {}: {}", id, reason);
            }
            if !report.is_complete() {
                anyhow::bail!("{} contacts could not be deleted", report.failed.len());
            }
        }
        Command::Import { path } => {
            let data = std::fs::read_to_string(&path)?;
            let report = book.import(&data).await?;
            println!("Imported {} contacts, skipped {}", report.imported, report.skipped);
        }
        Command::Export { path } => {
            let data = book.export()?;
            match path {
                Some(path) => {
                    std::fs::write(&path, data)?;
                    println!("Exported {} contacts to {}", book.contacts().len(), path.display());
                }
                None => println!("{}", data),
            }
        }
        Command::Health => {
            if !book.has_remote() {
                anyhow::bail!("remote.base_url is not configured");
            }
            if book.health().await {
                println!("Remote API is up");
            } else {
                anyhow::bail!("Remote API is unreachable");
            }
        }
        Command::Shell | Command::Serve => {}
    }

    Ok(())
}
