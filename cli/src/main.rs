mod commands;
mod config;
mod remote;

use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_catalog, cmd_catalog_lookup, cmd_ingredients_add, cmd_ingredients_clear,
    cmd_ingredients_list, cmd_ingredients_remove, cmd_ingredients_set, cmd_pantry_add,
    cmd_pantry_clear, cmd_pantry_list, cmd_pantry_remove, cmd_pantry_rename, cmd_reset, cmd_sync,
    cmd_whoami, describe_outcome,
};
use crate::config::Config;
use crate::remote::{HttpPantryRemote, OfflineRemote};
use larder_core::remote::PantryRemote;
use larder_core::service::PantryService;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "A local-first pantry that syncs when it can"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Skip identity and remote calls; work on local data only
    #[arg(long, global = true)]
    offline: bool,

    /// Pantry API base URL (overrides LARDER_API_URL and config.toml)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain an owner id if needed and reconcile with the remote pantry
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the owner id and where data lives
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all local data, including the owner id
    Reset {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the synced pantry
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Manage the local working ingredient list
    Ingredients {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Browse preset ingredients, or look up the category of a name
    Catalog {
        /// Only show this category (id or display name)
        #[arg(short, long)]
        category: Option<String>,
        /// Show the category and icon a name would get
        #[arg(long, value_name = "NAME", conflicts_with = "category")]
        lookup: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// List pantry items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add one or more items
    Add {
        /// Item names
        #[arg(required = true)]
        names: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename an item
    Rename {
        /// Item ID or current name
        item: String,
        /// New name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item
    Remove {
        /// Item ID or name
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every item
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// List selected ingredients
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Select one or more ingredients
    Add {
        /// Ingredient names
        #[arg(required = true)]
        names: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Deselect an ingredient
    Remove {
        /// Ingredient name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the selection
    Set {
        /// Ingredient names
        names: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Deselect everything
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Commands that read or change the pantry start with a sync so they work on
/// the reconciled view.
fn needs_sync(command: &Commands) -> bool {
    matches!(command, Commands::Pantry { .. })
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.api_url)?;
    let remote: Arc<dyn PantryRemote> = if cli.offline {
        Arc::new(OfflineRemote)
    } else {
        Arc::new(HttpPantryRemote::new(&config.remote)?)
    };
    let svc = PantryService::open(&config.db_path, remote)?;
    debug!(db = %config.db_path.display(), api = %config.remote.base_url, offline = cli.offline, "opened pantry");

    if needs_sync(&cli.command) && !cli.offline {
        let report = svc.init().await?;
        info!(outcome = %describe_outcome(&report.outcome), "startup sync");
    }

    match cli.command {
        Commands::Sync { json } => {
            if cli.offline {
                anyhow::bail!("Cannot sync with --offline");
            }
            let report = svc.init().await?;
            cmd_sync(&report, json)
        }
        Commands::Whoami { json } => cmd_whoami(&svc, &config, cli.offline, json).await,
        Commands::Reset { json } => cmd_reset(&svc, json).await,
        Commands::Pantry { command } => match command {
            PantryCommands::List { json } => cmd_pantry_list(&svc, json),
            PantryCommands::Add { names, json } => cmd_pantry_add(&svc, &names, json).await,
            PantryCommands::Rename { item, name, json } => {
                cmd_pantry_rename(&svc, &item, &name, json).await
            }
            PantryCommands::Remove { item, json } => cmd_pantry_remove(&svc, &item, json).await,
            PantryCommands::Clear { json } => cmd_pantry_clear(&svc, json).await,
        },
        Commands::Ingredients { command } => match command {
            IngredientCommands::List { json } => cmd_ingredients_list(&svc, json),
            IngredientCommands::Add { names, json } => cmd_ingredients_add(&svc, &names, json),
            IngredientCommands::Remove { name, json } => cmd_ingredients_remove(&svc, &name, json),
            IngredientCommands::Set { names, json } => cmd_ingredients_set(&svc, &names, json),
            IngredientCommands::Clear { json } => cmd_ingredients_clear(&svc, json),
        },
        Commands::Catalog {
            category,
            lookup,
            json,
        } => match lookup {
            Some(name) => cmd_catalog_lookup(&name, json),
            None => cmd_catalog(category.as_deref(), json),
        },
    }
}
