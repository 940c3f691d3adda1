//! QuirkLLM MCP server entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use quirkllm_mcp::config::{self, desktop};
use quirkllm_mcp::protocol::ProtocolHandler;
use quirkllm_mcp::tools::{ToolProvider, ToolRegistry};
use quirkllm_mcp::transport::StdioTransport;
use quirkllm_mcp::types::MCP_VERSION;
use quirkllm_mcp::ServerConfig;

#[derive(Parser)]
#[command(
    name = "quirkllm-mcp",
    about = "MCP server exposing QuirkLLM to desktop MCP clients over stdio",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    /// Falls back to QUIRKLLM_MCP_LOG, then "info".
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve {
        /// Run without a tool registry; no tools capability is advertised.
        #[arg(long)]
        no_tools: bool,

        /// Reject requests that arrive out of handshake order.
        #[arg(long)]
        strict_handshake: bool,

        /// Largest accepted frame body in bytes.
        #[arg(long)]
        max_message_bytes: Option<usize>,
    },

    /// Print server info, capabilities and tools as JSON.
    Info,

    /// Manage the desktop client's MCP server config.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   quirkllm-mcp completions bash > ~/.local/share/bash-completion/completions/quirkllm-mcp
    ///   quirkllm-mcp completions zsh > ~/.zfunc/_quirkllm-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config entry for this server.
    Show,

    /// Add this server to the desktop config.
    Install {
        /// Replace the whole config file instead of merging into it.
        #[arg(long)]
        overwrite: bool,

        /// Config file to edit (defaults to the platform location).
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Remove this server from the desktop config.
    Uninstall {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Report whether the server is installed.
    Status {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_level = config::log_level(cli.log_level.as_deref(), |key| std::env::var(key).ok());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Resolved after init so bad environment values are reported.
    let mut config = ServerConfig::from_env();
    config.log_level = log_level;

    match cli.command.unwrap_or(Commands::Serve {
        no_tools: false,
        strict_handshake: false,
        max_message_bytes: None,
    }) {
        Commands::Serve {
            no_tools,
            strict_handshake,
            max_message_bytes,
        } => {
            if strict_handshake {
                config.strict_handshake = true;
            }
            if let Some(max) = max_message_bytes.filter(|m| *m > 0) {
                config.max_message_bytes = max;
            }

            let tools = if no_tools {
                None
            } else {
                Some(Arc::new(ToolRegistry::new()) as Arc<dyn ToolProvider>)
            };

            let handler = ProtocolHandler::new(&config, tools);
            let mut transport =
                StdioTransport::new(handler).with_max_message_bytes(config.max_message_bytes);
            transport.run().await?;
        }

        Commands::Info => {
            let registry = Arc::new(ToolRegistry::new());
            let tools = registry.list_tools();
            let handler = ProtocolHandler::new(&config, Some(registry as Arc<dyn ToolProvider>));
            let info = serde_json::json!({
                "server": handler.server_info(),
                "protocol_version": MCP_VERSION,
                "capabilities": handler.capabilities(),
                "methods": handler.registry().methods(),
                "strict_handshake": config.strict_handshake,
                "max_message_bytes": config.max_message_bytes,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Config { action } => run_config(action)?,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "quirkllm-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn run_config(action: ConfigAction) -> anyhow::Result<()> {
    let resolve = |path: Option<PathBuf>| path.unwrap_or_else(desktop::desktop_config_path);

    match action {
        ConfigAction::Show => {
            let config = desktop::generate_config(&desktop::server_command());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Install { overwrite, path } => {
            let path = resolve(path);
            let written = desktop::install_config(&path, &desktop::server_command(), !overwrite)?;
            println!("Installed MCP config at {}", written.display());
            println!("Restart the desktop client to pick up the change.");
        }
        ConfigAction::Uninstall { path } => {
            let path = resolve(path);
            if desktop::uninstall_config(&path)? {
                println!("Removed {} from {}", desktop::SERVER_KEY, path.display());
            } else {
                println!("{} was not configured in {}", desktop::SERVER_KEY, path.display());
            }
        }
        ConfigAction::Status { path } => {
            let status = desktop::check_installation(&resolve(path));
            println!("{}", serde_json::to_string_pretty(&status)?);
            if !status.installed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
