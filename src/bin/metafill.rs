//! metafill CLI: inspect fill configuration and run fills against a store.
//!
//! Usage:
//!   metafill check-config <file> [--print]
//!   metafill item <subcommand> [--db path]
//!   metafill fill --config <file> --source <id> --field <key> [--place n] [--target id] [--db path]

use clap::{Parser, Subcommand};
use metafill::{
    Confidence, FillConfig, FillEngine, ItemId, ItemStore, MetadataFieldKey, MetadataStore, MetadataValue, OpenStore,
    SqliteStore,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "metafill",
    version,
    about = "Rule-driven metadata fill engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a fill configuration file
    CheckConfig {
        /// Path to the YAML configuration
        path: PathBuf,
        /// Print the normalized configuration
        #[arg(long)]
        print: bool,
    },
    /// Manage items and their metadata
    Item {
        #[command(subcommand)]
        action: ItemAction,
        /// Path to SQLite database file
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
    /// Fill a target item from a trigger value on a source item
    Fill {
        /// Path to the YAML configuration
        #[arg(long)]
        config: PathBuf,
        /// Item holding the trigger value
        #[arg(long)]
        source: ItemId,
        /// Field of the trigger value
        #[arg(long)]
        field: MetadataFieldKey,
        /// Place of the trigger value within its field
        #[arg(long, default_value_t = 0)]
        place: usize,
        /// Item to fill; a new item is created when omitted
        #[arg(long)]
        target: Option<ItemId>,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Create a new empty item
    Create,
    /// Append a metadata value to an item
    Add {
        /// Item to modify
        id: ItemId,
        /// Field key, e.g. dc.contributor.author
        field: MetadataFieldKey,
        /// Literal value
        value: String,
        /// Authority key
        #[arg(long)]
        authority: Option<String>,
        /// Authority confidence score
        #[arg(long, default_value_t = Confidence::UNSET.score(), allow_negative_numbers = true)]
        confidence: i32,
        /// Language code
        #[arg(long)]
        language: Option<String>,
    },
    /// Show the metadata of an item
    Show {
        /// Item to show
        id: ItemId,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Get the default database path (~/.local/share/metafill/metafill.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("metafill").join("metafill.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metafill=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check_config(path: &Path, print: bool) -> i32 {
    let config = match FillConfig::load(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if print {
        match serde_yaml::to_string(&config) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        return 0;
    }

    println!(
        "{} trigger field(s), allows_update_by_default = {}",
        config.len(),
        config.allows_update_by_default
    );
    for (trigger, conf) in config.triggers() {
        let update = conf
            .update_enabled
            .map(|u| u.to_string())
            .unwrap_or_else(|| "default".to_string());
        println!("  {} (update: {}, {} mapping(s))", trigger, update, conf.mapping.len());
    }
    0
}

fn cmd_item_create(store: &SqliteStore) -> i32 {
    match store.create_item() {
        Ok(id) => {
            println!("{}", id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_item_add(
    store: &SqliteStore,
    id: &ItemId,
    field: &MetadataFieldKey,
    value: &str,
    authority: Option<&str>,
    confidence: i32,
    language: Option<&str>,
) -> i32 {
    match store.add_metadata(id, field, language, value, authority, Confidence::new(confidence)) {
        Ok(added) => {
            println!("Added {}[{}] to {}", added.field, added.place, id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_item_show(store: &SqliteStore, id: &ItemId, json: bool) -> i32 {
    let values = match store.all_metadata(id) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if json {
        return match serde_json::to_string_pretty(&values) {
            Ok(s) => {
                println!("{}", s);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }

    if values.is_empty() {
        println!("No metadata.");
        return 0;
    }
    println!("{:<36}  {:>5}  {:<40}  {:<10}", "FIELD", "PLACE", "VALUE", "AUTHORITY");
    println!("{}", "-".repeat(96));
    for v in values {
        println!(
            "{:<36}  {:>5}  {:<40}  {:<10}",
            v.field.to_string(),
            v.place,
            v.value,
            v.authority.as_deref().unwrap_or("")
        );
    }
    0
}

fn find_trigger(store: &SqliteStore, source: &ItemId, field: &MetadataFieldKey, place: usize) -> Result<MetadataValue, String> {
    let values = store.get_metadata(source, field).map_err(|e| e.to_string())?;
    values
        .into_iter()
        .find(|v| v.place == place)
        .ok_or_else(|| format!("{} has no {} value at place {}", source, field, place))
}

fn cmd_fill(
    store: &SqliteStore,
    config: &Path,
    source: &ItemId,
    field: &MetadataFieldKey,
    place: usize,
    target: Option<ItemId>,
) -> i32 {
    let engine = match FillConfig::load(config) {
        Ok(c) => FillEngine::new(c),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let trigger = match find_trigger(store, source, field, place) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if engine.configuration_for(&trigger).is_none() {
        println!("No configuration for {}; nothing to fill", trigger.field);
        return 0;
    }

    let result = match target {
        Some(target) => engine.fill_item_atomic(store, &trigger, &target).map(|report| (target, report)),
        None => engine.fill_new_item_atomic(store, &trigger),
    };
    match result {
        Ok((target, report)) => {
            println!("Filled {} from {} ({})", target, trigger.field, trigger.value);
            for outcome in &report.mappings {
                println!("  {}", outcome);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::CheckConfig { path, print } => cmd_check_config(&path, print),
        Commands::Item { action, db } => {
            let store = match open_store(db) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            match action {
                ItemAction::Create => cmd_item_create(&store),
                ItemAction::Add { id, field, value, authority, confidence, language } => cmd_item_add(
                    &store,
                    &id,
                    &field,
                    &value,
                    authority.as_deref(),
                    confidence,
                    language.as_deref(),
                ),
                ItemAction::Show { id, json } => cmd_item_show(&store, &id, json),
            }
        }
        Commands::Fill { config, source, field, place, target, db } => match open_store(db) {
            Ok(store) => cmd_fill(&store, &config, &source, &field, place, target),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
