//! jim: inventory manager for locations, boxes and items
//!
//! # Usage
//!
//! ```bash
//! jim create entry --entry-id L0001 --name "garage"
//! jim create entry --entry-id B001 --parent-id L0001 --name "tool box"
//! jim create meta --entry-id B001 --name fragile --type tag
//! jim browse L0001
//! jim search tool box
//! jim export backup.json
//! jim --db /tmp/other.db import backup.json --force
//! ```

mod render;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use jim_store::{
    normalize_entry_id, Entry, EntryPatch, EntryRepository, EntryType, JimConfig, MetaPatch,
    MetaRepository, MetaType, NewEntry, NewMeta, SqliteInventoryStore,
};

#[derive(Parser)]
#[command(name = "jim", version)]
#[command(about = "Inventory manager for locations, boxes and items", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides the configuration file and JIM_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log more (-v debug, -vv trace)
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create entry or meta
    #[command(subcommand)]
    Create(CreateCommand),

    /// Update the info of a given entry or meta
    #[command(subcommand)]
    Update(UpdateCommand),

    /// Delete an entry or metadata
    #[command(subcommand)]
    Delete(DeleteCommand),

    /// View details of a given entry
    View {
        entry_id: String,
    },

    /// Browse all entries under a given parent (roots when omitted)
    Browse {
        parent_id: Option<String>,

        /// Display all details for each entry, like `view`
        #[arg(short, long)]
        all: bool,
    },

    /// Search entries with a set of keywords
    Search {
        #[arg(required = true, value_parser = parse_keyword)]
        keywords: Vec<String>,

        /// Only match TAG metadata names
        #[arg(long)]
        tags: bool,
    },

    /// Delete orphan (unreachable) entries and fix parent references
    Sync,

    /// Export data into a json file, orphans excluded
    Export {
        target: PathBuf,
    },

    /// Import data from a json file
    Import(ImportArgs),
}

#[derive(Subcommand)]
enum CreateCommand {
    /// Create entry
    Entry {
        #[arg(long)]
        entry_id: String,

        /// Inferred from the entry id prefix (L/B/I) when omitted
        #[arg(long = "type")]
        entry_type: Option<EntryType>,

        /// Must exist when given
        #[arg(long)]
        parent_id: Option<String>,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// Create meta on an existing entry
    Meta {
        #[arg(long)]
        entry_id: String,

        #[arg(long)]
        name: String,

        #[arg(long = "type")]
        meta_type: MetaType,

        /// Ignored for TAG
        #[arg(long, default_value = "")]
        value: String,
    },
}

#[derive(Subcommand)]
enum UpdateCommand {
    /// Update the info of a given entry
    Entry {
        entry_id: String,

        /// New parent id, or `null` to move to the root level
        #[arg(long)]
        parent_id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Update the info of a given meta
    Meta {
        entry_id: String,

        meta_name: String,

        #[arg(long = "type")]
        meta_type: Option<MetaType>,

        #[arg(long)]
        value: Option<String>,
    },
}

#[derive(Subcommand)]
enum DeleteCommand {
    /// Delete entry; its children move up to its parent
    Entry { entry_id: String },

    /// Delete meta
    Meta { entry_id: String, meta_name: String },
}

#[derive(Args)]
struct ImportArgs {
    source: PathBuf,

    /// Overwrite existing records that differ
    #[arg(short, long)]
    force: bool,

    /// Print what is skipped or overwritten
    #[arg(long)]
    verbose: bool,
}

fn parse_keyword(s: &str) -> std::result::Result<String, String> {
    if s.chars().count() < 2 {
        return Err("Keyword must be at least 2 characters".to_string());
    }
    Ok(s.to_string())
}

fn init_tracing(cli: &Cli) {
    let filter = match cli.verbosity {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "jim=info,jim_store=info".into()),
        1 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };
    let filter = match &cli.command {
        Commands::Import(args) if args.verbose => {
            match "jim_store::application=debug".parse::<tracing_subscriber::filter::Directive>() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        }
        _ => filter,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(cli: &Cli) -> Result<SqliteInventoryStore> {
    let config = match &cli.config {
        Some(path) => JimConfig::from_yaml(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => JimConfig::default(),
    };
    let config = config
        .with_env_overrides()
        .with_database_path(cli.db.clone());
    config.validate()?;

    debug!(path = %config.database.path.display(), "opening database");
    Ok(SqliteInventoryStore::open(&config.database)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let store = open_store(&cli)?;

    match cli.command {
        Commands::Create(command) => create(&store, command),
        Commands::Update(command) => update(&store, command),
        Commands::Delete(command) => delete(&store, command),
        Commands::View { entry_id } => view(&store, &entry_id),
        Commands::Browse { parent_id, all } => browse(&store, parent_id.as_deref(), all),
        Commands::Search { keywords, tags } => search(&store, &keywords, tags),
        Commands::Sync => sync(&store),
        Commands::Export { target } => export(&store, target),
        Commands::Import(args) => import(&store, args),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn print_entry(store: &SqliteInventoryStore, entry: &Entry, indent: &str) -> Result<()> {
    let metadata = store.list_by_entry(&entry.entry_id)?;
    println!("{}", render::entry(entry, &metadata, indent));
    Ok(())
}

fn create(store: &SqliteInventoryStore, command: CreateCommand) -> Result<()> {
    match command {
        CreateCommand::Entry {
            entry_id,
            entry_type,
            parent_id,
            name,
            note,
        } => {
            if name.lines().count() > 1 {
                bail!("Name must be single line");
            }
            let entry = store.insert_entry(NewEntry {
                entry_id,
                entry_type,
                parent_entry_id: parent_id,
                name,
                note,
            })?;
            print_entry(store, &entry, "")
        }
        CreateCommand::Meta {
            entry_id,
            name,
            meta_type,
            value,
        } => {
            let meta = store.insert_meta(NewMeta {
                entry_id,
                name,
                meta_type,
                value,
            })?;
            println!("ON {}:", meta.entry_id);
            println!("{}", render::meta(&meta, "\t"));
            Ok(())
        }
    }
}

fn update(store: &SqliteInventoryStore, command: UpdateCommand) -> Result<()> {
    match command {
        UpdateCommand::Entry {
            entry_id,
            parent_id,
            name,
            note,
        } => {
            let patch = EntryPatch {
                entry_type: None,
                parent_entry_id: parent_id.map(|p| (p != "null").then_some(p)),
                name,
                note,
            };
            if patch.is_empty() {
                bail!("Nothing to update: pass --parent-id, --name or --note");
            }
            let entry = store.update_entry_fields(&entry_id, patch)?;
            print_entry(store, &entry, "")
        }
        UpdateCommand::Meta {
            entry_id,
            meta_name,
            meta_type,
            value,
        } => {
            let meta =
                store.update_meta_fields(&entry_id, &meta_name, MetaPatch { meta_type, value })?;
            println!("ON {}:", meta.entry_id);
            println!("{}", render::meta(&meta, "\t"));
            Ok(())
        }
    }
}

fn delete(store: &SqliteInventoryStore, command: DeleteCommand) -> Result<()> {
    match command {
        DeleteCommand::Entry { entry_id } => {
            let metadata = store.list_by_entry(&entry_id)?;
            let entry = store.delete_entry(&entry_id)?;
            println!("Deleted: ");
            println!("{}", render::entry(&entry, &metadata, "\t"));
        }
        DeleteCommand::Meta {
            entry_id,
            meta_name,
        } => {
            let meta = store.delete_meta(&entry_id, &meta_name)?;
            println!("Deleted from {}:", meta.entry_id);
            println!("{}", render::meta(&meta, "\t"));
        }
    }
    Ok(())
}

fn view(store: &SqliteInventoryStore, entry_id: &str) -> Result<()> {
    match store.get_by_id(entry_id)? {
        Some(entry) => print_entry(store, &entry, ""),
        None => bail!("Entry {} not found", normalize_entry_id(entry_id)),
    }
}

fn browse(store: &SqliteInventoryStore, parent_id: Option<&str>, all: bool) -> Result<()> {
    if let Some(parent_id) = parent_id {
        if !store.exists_by_id(parent_id)? {
            bail!("Parent entry {} not found", normalize_entry_id(parent_id));
        }
    }

    for entry in store.list_children(parent_id)? {
        if all {
            print_entry(store, &entry, "")?;
        } else {
            let children = store.count_children(Some(&entry.entry_id))?;
            let metadata = store.list_by_entry(&entry.entry_id)?;
            println!("{}", render::summary(&entry, children, &metadata));
        }
    }
    Ok(())
}

fn search(store: &SqliteInventoryStore, keywords: &[String], tags: bool) -> Result<()> {
    if !tags {
        for entry in store.search(keywords)? {
            print_entry(store, &entry?, "")?;
        }
        return Ok(());
    }

    let mut seen = HashSet::new();
    for keyword in keywords {
        for entry in store.search_tags(keyword)? {
            let entry = entry?;
            if seen.insert(entry.entry_id.clone()) {
                print_entry(store, &entry, "")?;
            }
        }
    }
    Ok(())
}

fn sync(store: &SqliteInventoryStore) -> Result<()> {
    println!("Scanning... Please do not perform any operation");
    let report = store.reconcile()?;

    if !report.reported.is_empty() {
        println!("The following entries were deleted:");
        for entry in &report.reported {
            println!("{}", render::entry(entry, &[], "    "));
        }
    }
    println!("Removed {} orphan entry(s)", report.removed);
    Ok(())
}

fn export(store: &SqliteInventoryStore, target: PathBuf) -> Result<()> {
    let file = File::create(&target)
        .with_context(|| format!("Cannot create {}", target.display()))?;
    let stats = store.export_json(BufWriter::new(file))?;
    println!(
        "Exported {} entry(s) and {} metadata(s)",
        stats.entries, stats.metadata
    );
    Ok(())
}

fn import(store: &SqliteInventoryStore, args: ImportArgs) -> Result<()> {
    let file = File::open(&args.source)
        .with_context(|| format!("Cannot open {}", args.source.display()))?;
    let stats = store.import_json(BufReader::new(file), args.force)?;

    println!("Imported {} entry(s)", stats.entries_imported);
    if stats.entries_skipped > 0 {
        println!("Skipped {} entry(s)", stats.entries_skipped);
    }
    if stats.entries_overwritten > 0 {
        println!("Overwrote {} entry(s)", stats.entries_overwritten);
    }
    println!("Imported {} metadata(s)", stats.metadata_imported);
    if stats.metadata_skipped > 0 {
        println!("Skipped {} metadata(s)", stats.metadata_skipped);
    }
    if stats.metadata_overwritten > 0 {
        println!("Overwrote {} metadata(s)", stats.metadata_overwritten);
    }
    Ok(())
}
