use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use wisp::{
    ChatSession, Config, HttpReplyFetcher, IdentityResolver, IdentityStore, JsonRpcWallet,
    Sender,
};

#[derive(Parser)]
#[command(name = "wisp")]
#[command(version)]
#[command(about = "Chat with a remote assistant from your terminal", long_about = None)]
struct Cli {
    /// Reply endpoint URL (overrides config and WISP_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Wallet JSON-RPC URL used by `connect` (overrides config and WISP_WALLET_RPC)
    #[arg(long, global = true)]
    wallet_rpc: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the replies
    Send { text: Vec<String> },
    /// Show the active identity
    Whoami,
    /// Connect a wallet and use its address as identity
    Connect,
    /// Disconnect the wallet and start a new session id
    Disconnect,
}

fn init_logging(config: &Config, to_file: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wisp=info"));

    if to_file {
        // The TUI owns the terminal, so logs go to ~/.wisp/wisp.log
        let file_appender = tracing_appender::rolling::never(&config.wisp_home, "wisp.log");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(rpc) = cli.wallet_rpc {
        config.wallet_rpc_url = Some(rpc);
    }

    let _guard = init_logging(&config, cli.command.is_none())?;
    info!(endpoint = %config.endpoint, "wisp starting");

    let store = IdentityStore::in_dir(&config.wisp_home);
    let mut identity = IdentityResolver::load(store).context("Failed to load identity")?;
    let wallet = Arc::new(JsonRpcWallet::new(config.wallet_rpc_url.clone()));

    match cli.command {
        None => {
            let fetcher = Arc::new(HttpReplyFetcher::new(config.endpoint.clone())?);
            let session = ChatSession::new(identity, fetcher);
            wisp::ui::run(&config, session, wallet).await?;
        }
        Some(Commands::Send { text }) => {
            let fetcher = Arc::new(HttpReplyFetcher::new(config.endpoint.clone())?);
            let mut session = ChatSession::new(identity, fetcher);
            let before = session.conversation().len();
            session.send(&text.join(" ")).await;

            let replies = session.conversation().messages()[before..]
                .iter()
                .filter(|m| m.sender() == Sender::Assistant);
            for reply in replies {
                println!("🤖 {}", reply.text());
            }
        }
        Some(Commands::Whoami) => {
            println!("🔑 {}", identity.current());
        }
        Some(Commands::Connect) => match identity.connect(wallet.as_ref()).await {
            Ok(current) => println!("✅ Connected: {}", current),
            Err(e) => println!("❌ {}", e),
        },
        Some(Commands::Disconnect) => {
            let current = identity.disconnect().context("Failed to save new identity")?;
            println!("✅ Disconnected: {}", current);
        }
    }

    Ok(())
}
