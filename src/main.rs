use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use yaru_bot::actions::ActionRegistry;
use yaru_bot::channels::{
    ChannelPublisher, DiscordRest, InteractionState, SignatureVerifier, WebhookServer,
    WebhookServerConfig, router,
};
use yaru_bot::commands::{post_panel, register_commands};
use yaru_bot::config::{DiscordSettings, ServeSettings, env_lookup};
use yaru_bot::orchestrator::{Orchestrator, PipelineTasks};
use yaru_bot::sheets::{GoogleSheetsStore, LogWriter, ServiceAccountKey, ServiceAccountTokens};

#[derive(Parser, Debug)]
#[command(name = "yaru-bot")]
#[command(about = "Announce declarations and reports on Discord and log them to Google Sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the interactions endpoint (default if no subcommand given)
    Serve {
        /// Do not overwrite slash commands at startup
        #[arg(long)]
        skip_register: bool,
    },

    /// Register the slash commands and exit
    RegisterCommands,

    /// Post the button panel to a channel
    PostPanel {
        /// Channel to post to
        #[arg(long, env = "TARGET_CHANNEL_ID")]
        channel_id: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("yaru_bot=info,tower_http=info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let discord = DiscordSettings::from_lookup(env_lookup)?;
    let rest = DiscordRest::new(discord.rest.clone());

    match cli.command.unwrap_or(Command::Serve {
        skip_register: false,
    }) {
        Command::Serve { skip_register } => serve(rest, &discord, skip_register).await,
        Command::RegisterCommands => {
            let count = register_commands(&rest, discord.guild_id.as_deref()).await?;
            println!("Registered {} slash commands", count);
            Ok(())
        }
        Command::PostPanel { channel_id } => {
            let message_id = post_panel(&rest, &channel_id).await?;
            println!("Posted panel message {}", message_id);
            Ok(())
        }
    }
}

async fn serve(rest: DiscordRest, discord: &DiscordSettings, skip_register: bool) -> anyhow::Result<()> {
    let settings = ServeSettings::from_lookup(env_lookup)?;
    let verifier = SignatureVerifier::from_hex(&settings.public_key)?;
    let key = ServiceAccountKey::from_file(&settings.service_account_file)?;

    if !skip_register {
        // A stale command list is recoverable; keep serving.
        match register_commands(&rest, discord.guild_id.as_deref()).await {
            Ok(count) => tracing::info!("Synced {} slash commands", count),
            Err(e) => tracing::error!("Slash command sync failed: {}", e),
        }
    }

    let tokens = Arc::new(ServiceAccountTokens::new(key));
    let store = Arc::new(GoogleSheetsStore::with_base_url(
        tokens,
        settings.sheets_base.clone(),
    ));
    let orchestrator = Orchestrator::new(
        ChannelPublisher::new(Arc::new(rest.clone()), settings.target_channel_id.clone()),
        LogWriter::new(store, settings.spreadsheet_id.clone(), settings.sheet_name.clone()),
    );

    // Old panels must resolve before the first interaction is accepted.
    let registry = Arc::new(ActionRegistry::new());
    registry.restore().await;

    let tasks = PipelineTasks::new();
    let mut server = WebhookServer::new(WebhookServerConfig {
        addr: settings.bind_addr,
    });
    server.add_routes(router(InteractionState {
        verifier,
        registry,
        orchestrator,
        responders: Arc::new(rest),
        tasks: tasks.clone(),
    }));
    let addr = server.start().await?;
    tracing::info!(
        %addr,
        channel_id = %settings.target_channel_id,
        sheet = %settings.sheet_name,
        "yaru-bot ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    server.shutdown().await;
    // Accepted submissions finish (and get their log row) before exit.
    let pending = tasks.drain().await;
    tracing::info!(pending, "Shutdown complete");
    Ok(())
}
