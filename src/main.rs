//! mxstack - command-line entry point
//!
//! Run with `mxstack --help` for usage.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mxstack::{
    config::Config,
    error::{Error, StackError},
    registry::Registry,
    ssh::{read_password, SessionEnd, SshLauncher},
    stack::{Address, Protocol, Resolver, SearchKind},
    APP_NAME, VERSION,
};

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Import, search, and connect to MobaXterm session stacks")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a session-stack file under a short name
    Import {
        /// Path to the exported session-stack file
        path: PathBuf,

        /// Name to address the stack by
        name: String,
    },

    /// Remove an imported session stack from the registry
    Delete {
        /// Name of the stack to remove
        name: String,
    },

    /// Search sessions and directories across all imported stacks
    Search {
        /// Kind of object to search for
        #[arg(short = 't', long = "type", value_enum, default_value_t = ObjectType::Any)]
        object_type: ObjectType,

        /// Case-insensitive substring to match
        pattern: String,
    },

    /// Open an interactive connection to a session
    Connect {
        /// Session address, `/stack/dir/.../name` or `dir/.../name`
        address: String,
    },

    /// List imported stacks as a nested outline
    List {
        /// Directory address to list instead of everything
        address: Option<String>,
    },

    /// Create a directory or session inside a stack
    Create {
        /// Address of the object to create
        address: String,
    },
}

/// Searchable object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ObjectType {
    Session,
    Directory,
    Any,
}

impl From<ObjectType> for SearchKind {
    fn from(kind: ObjectType) -> Self {
        match kind {
            ObjectType::Session => SearchKind::Session,
            ObjectType::Directory => SearchKind::Directory,
            ObjectType::Any => SearchKind::Any,
        }
    }
}

fn setup_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Log to stderr so list/search output stays pipeable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    Ok(())
}

/// Resolve the address and hand the session to the SSH client
async fn connect(config: &Config, resolver: &Resolver, raw_address: &str) -> Result<()> {
    let address = Address::parse(raw_address).map_err(Error::from)?;
    let resolved = resolver.resolve_session(&address)?;
    let record = &resolved.record;

    match record.protocol {
        Protocol::Ssh => {}
        Protocol::Rdp => {
            // Recognized, intentionally not launched
            println!("RDP session '{}' recognized; RDP launch is not implemented", resolved.address());
            return Ok(());
        }
        Protocol::Unknown => {
            return Err(Error::Stack(StackError::UnsupportedProtocol(resolved.address())).into());
        }
    }

    let key_path = match record.key_file {
        Some(ref file) => Some(config.key_dir()?.join(file)),
        None => None,
    };
    let password = match key_path {
        Some(_) => None,
        None => Some(read_password(&format!(
            "{}@{}'s password: ",
            record.user, record.host
        ))?),
    };

    let launcher = SshLauncher::from_config(config)?;
    let end = launcher
        .open_interactive(
            &record.host,
            record.port,
            &record.user,
            key_path.as_deref(),
            password.as_deref(),
        )
        .await?;

    if end == SessionEnd::Interrupted {
        println!("\nConnection closed by user.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config, using defaults: {}", e);
        Config::default()
    });

    // Ensure required directories exist
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Failed to create directories: {}", e);
    }

    setup_logging(cli.debug || config.debug)?;

    let registry_path = config.registry_path()?;

    match cli.command {
        Commands::Import { path, name } => {
            let mut registry = Registry::load(&registry_path)?;
            registry.import(&name, &path)?;
            println!("Imported '{}' from {}", name, path.display());
        }

        Commands::Delete { name } => {
            let mut registry = Registry::load(&registry_path)?;
            registry.delete(&name)?;
            println!("Deleted '{}'", name);
        }

        Commands::Search {
            object_type,
            pattern,
        } => {
            let registry = Registry::load(&registry_path)?;
            let resolver = Resolver::load(&registry)?;
            for hit in resolver.search(object_type.into(), &pattern) {
                println!("{}", hit.render());
            }
        }

        Commands::Connect { address } => {
            let registry = Registry::load(&registry_path)?;
            let resolver = Resolver::load(&registry)?;
            connect(&config, &resolver, &address).await?;
        }

        Commands::List { address } => {
            let registry = Registry::load(&registry_path)?;
            let resolver = Resolver::load(&registry)?;
            let parsed = match address {
                Some(ref raw) => Some(Address::parse(raw).map_err(Error::from)?),
                None => None,
            };
            print!("{}", resolver.render_list(parsed.as_ref())?);
        }

        Commands::Create { address } => {
            // Validate the address so the user gets the right error first
            Address::parse(&address).map_err(Error::from)?;
            return Err(Error::Unsupported("create").into());
        }
    }

    Ok(())
}
