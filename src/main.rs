//! Claimstore CLI - operator front-end for the claim metadata store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use claimstore::TenantId;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "claimstore")]
#[command(version)]
#[command(about = "Tenant-aware persistence for identity claim dialects, claims and claim properties")]
#[command(long_about = r#"
Claimstore keeps claim metadata in a SQLite database, partitioned by tenant:
  • Claim dialects (URI namespaces)
  • Claims within a dialect
  • Name/value properties attached to a claim

Example usage:
  claimstore --tenant 5 dialect add urn:test
  claimstore --tenant 5 claim add --dialect urn:test urn:test#attr1 -p Description=Test
  claimstore --tenant 5 property get --dialect urn:test urn:test#attr1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tenant to operate on (overrides the config file)
    #[arg(short, long, global = true, allow_hyphen_values = true)]
    tenant: Option<TenantId>,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a claimstore.toml config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage claim dialects
    #[command(subcommand)]
    Dialect(DialectCommand),

    /// Manage claims
    #[command(subcommand)]
    Claim(ClaimCommand),

    /// Manage claim properties
    #[command(subcommand)]
    Property(PropertyCommand),
}

#[derive(Subcommand)]
pub enum DialectCommand {
    /// List the dialects of the tenant
    List,
    /// Add a dialect (adding an existing one is a no-op)
    Add { uri: String },
    /// Change the URI of a dialect
    Rename { old: String, new: String },
    /// Remove a dialect together with its claims
    Remove { uri: String },
}

#[derive(Subcommand)]
pub enum ClaimCommand {
    /// List the claims of a dialect
    List {
        #[arg(long)]
        dialect: String,
    },
    /// Add a claim and, in the same transaction, its properties
    Add {
        #[arg(long)]
        dialect: String,
        claim: String,
        /// Property as name=value (repeatable)
        #[arg(short, long = "property", value_parser = commands::parse_property)]
        properties: Vec<(String, String)>,
    },
    /// Print the id of a claim
    Id {
        #[arg(long)]
        dialect: String,
        claim: String,
    },
    /// Remove a claim and its properties
    Remove {
        #[arg(long)]
        dialect: String,
        claim: String,
    },
}

#[derive(Subcommand)]
pub enum PropertyCommand {
    /// Show the properties of a claim
    Get {
        #[arg(long)]
        dialect: String,
        claim: String,
    },
    /// Replace the properties of a claim
    Set {
        #[arg(long)]
        dialect: String,
        claim: String,
        /// Property as name=value (repeatable)
        #[arg(short, long = "property", value_parser = commands::parse_property)]
        properties: Vec<(String, String)>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = commands::Settings::resolve(cli.config, cli.database, cli.tenant, cli.json)?;

    let result = match cli.command {
        Commands::Init { force } => commands::run_init(&settings, force),
        Commands::Dialect(cmd) => commands::run_dialect(&settings, cmd),
        Commands::Claim(cmd) => commands::run_claim(&settings, cmd),
        Commands::Property(cmd) => commands::run_property(&settings, cmd),
    };

    if let Err(e) = &result {
        if let Some(store_err) = e.downcast_ref::<claimstore::Error>() {
            if store_err.is_client_error() && !settings.json {
                claimstore::ui::error(&store_err.to_string());
                std::process::exit(2);
            }
        }
    }
    result
}
