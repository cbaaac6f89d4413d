mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_INVALID_REQUEST, EXIT_REGISTRY_ERROR};
use libertine_core::{ContainerManager, ToolConfig, MANAGER_TOOL};
use libertine_store::RegistryStore;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "libertine-manager",
    version,
    about = "Manage Libertine application containers"
)]
struct Cli {
    /// Path to the container registry file
    /// (default: ~/.local/share/libertine/ContainersConfig.json).
    #[arg(long, global = true)]
    registry: Option<String>,

    /// Container-manager executable that performs the actual container work.
    #[arg(long, default_value = MANAGER_TOOL, global = true)]
    tool: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new container.
    Create {
        /// Container identifier.
        id: String,
        /// Human-readable container name (defaults to the id).
        #[arg(short, long)]
        name: Option<String>,
        /// Distribution series to bootstrap.
        #[arg(short, long, default_value = "focal")]
        distro: String,
        /// Container backend type recorded in the registry.
        #[arg(long = "type", default_value = "lxc")]
        container_type: String,
        /// Enable i386 multiarch support.
        #[arg(short, long, default_value_t = false)]
        multiarch: bool,
        /// Read the privilege-elevation password from stdin.
        #[arg(long, default_value_t = false)]
        password_stdin: bool,
    },
    /// Destroy a container and drop it from the registry.
    Destroy {
        /// Container identifier.
        id: String,
    },
    /// Install a package inside a container.
    InstallPackage {
        /// Container identifier.
        id: String,
        /// Debian package name.
        package: String,
    },
    /// Remove a package from a container.
    RemovePackage {
        /// Container identifier.
        id: String,
        /// Debian package name.
        package: String,
    },
    /// Search a container's package cache.
    SearchCache {
        /// Container identifier.
        id: String,
        /// Search query.
        query: String,
    },
    /// Update the packages of a container.
    Update {
        /// Container identifier.
        id: String,
    },
    /// Run a command inside a container and print its output.
    Exec {
        /// Container identifier.
        id: String,
        /// Command and arguments to run (after --).
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Pass a raw configure subcommand through to the tool.
    Configure {
        /// Container identifier.
        id: String,
        /// Configure subcommand (e.g. --multiarch).
        subcommand: String,
        /// Arguments for the subcommand (after --).
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Add an extra APT archive to a container.
    AddArchive {
        /// Container identifier.
        id: String,
        /// Archive name (e.g. a ppa: line).
        archive: String,
        /// Public signing key file for the archive.
        #[arg(long)]
        public_key_file: Option<PathBuf>,
    },
    /// Set (or clear) the default container.
    SetDefault {
        /// Container identifier.
        #[arg(conflicts_with = "clear")]
        id: Option<String>,
        /// Clear the default container instead of setting one.
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Repair interrupted package operations.
    FixIntegrity,
    /// List containers in the registry.
    List,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LIBERTINE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let store = match registry_store(cli.registry.as_deref()) {
        Ok(store) => store,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_REGISTRY_ERROR);
        }
    };
    let manager = ContainerManager::new(ToolConfig {
        executable: cli.tool.clone(),
        ..ToolConfig::default()
    });
    let json = cli.json;

    let result = match cli.command {
        Commands::Create {
            id,
            name,
            distro,
            container_type,
            multiarch,
            password_stdin,
        } => {
            commands::create::run(
                &manager,
                &store,
                commands::create::CreateArgs {
                    id: &id,
                    name: name.as_deref(),
                    distro: &distro,
                    container_type: &container_type,
                    multiarch,
                    password_stdin,
                },
                json,
            )
            .await
        }
        Commands::Destroy { id } => commands::destroy::run(&manager, &store, &id, json).await,
        Commands::InstallPackage { id, package } => {
            commands::install::run(&manager, &store, &id, &package, json).await
        }
        Commands::RemovePackage { id, package } => {
            commands::remove::run(&manager, &store, &id, &package, json).await
        }
        Commands::SearchCache { id, query } => {
            commands::search::run(&manager, &id, &query, json).await
        }
        Commands::Update { id } => commands::update::run(&manager, &store, &id, json).await,
        Commands::Exec { id, command } => {
            commands::exec::run(&manager, &id, &command.join(" "), json).await
        }
        Commands::Configure {
            id,
            subcommand,
            args,
        } => commands::configure::run(&manager, &id, &subcommand, &args, json).await,
        Commands::AddArchive {
            id,
            archive,
            public_key_file,
        } => {
            commands::add_archive::run(
                &manager,
                &store,
                &id,
                &archive,
                public_key_file.as_deref(),
                json,
            )
            .await
        }
        Commands::SetDefault { id, clear } => {
            if id.is_none() && !clear {
                Err("set-default needs a container id or --clear".to_owned())
            } else {
                commands::set_default::run(&manager, &store, id.as_deref(), json).await
            }
        }
        Commands::FixIntegrity => commands::fix_integrity::run(&manager, json).await,
        Commands::List => commands::list::run(&store, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("invalid request:") {
                EXIT_INVALID_REQUEST
            } else if msg.starts_with("registry error:") {
                EXIT_REGISTRY_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn registry_store(path: Option<&str>) -> Result<RegistryStore, String> {
    match path {
        Some(p) => Ok(RegistryStore::new(expand_tilde(p))),
        None => RegistryStore::at_default_location().map_err(|e| format!("registry error: {e}")),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
