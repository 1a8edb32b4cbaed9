use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use serenity::all::Http;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord notifier that pings linked players when their match starts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides HTTP_PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Keep player links in memory instead of the configured store
    #[arg(long)]
    memory_store: bool,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

mod commands;
mod config;
mod error;
mod logging;
mod managers;
mod messages;
mod models;
mod outbound;
mod state;
mod verification;
mod web;

use commands::LinkCommandHandler;
use config::{DeliveryMode, Settings, StoreBackend};
use managers::{LfgBanner, MatchNotifier, ThreadCleanup};
use outbound::{
    BotChannel, SerenityApi, SharedDiscordApi, SharedOutboundChannel, ThreadReuse, WebhookChannel,
};
use state::{IdentityStore, MemoryKv, SharedKeyValueStore, UpstashKv};
use web::{start_web_server, AppState, WebServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    if args.memory_store {
        settings.store = StoreBackend::Memory;
    }

    info!(
        "Store backend: {}, delivery mode: {}",
        settings.store.name(),
        settings.delivery.name()
    );
    if settings.store == StoreBackend::Memory {
        warn!("Player links are kept in memory and will be lost on restart");
    }

    let kv: SharedKeyValueStore = match &settings.store {
        StoreBackend::Memory => Arc::new(MemoryKv::new()),
        StoreBackend::Upstash { url, token } => {
            Arc::new(UpstashKv::new(url, token, settings.store_timeout)?)
        }
    };
    let identity_store = IdentityStore::new(kv.clone(), settings.store_timeout);

    let (outbound, cleanup, lfg): (
        SharedOutboundChannel,
        Option<ThreadCleanup>,
        Option<LfgBanner>,
    ) = match &settings.delivery {
        DeliveryMode::Webhook { url } => {
            if settings.lfg.is_some() {
                warn!("DISCORD_LFG_CHANNEL_ID is ignored in webhook delivery mode");
            }
            (
                Arc::new(WebhookChannel::new(url, settings.delivery_timeout)?),
                None,
                None,
            )
        }
        DeliveryMode::Channel { bot_token, channel_id }
        | DeliveryMode::Thread { bot_token, channel_id } => {
            let http = Arc::new(Http::new(bot_token));
            let api: SharedDiscordApi = Arc::new(SerenityApi::new(http));
            let reuse = settings
                .delivery
                .uses_threads()
                .then(|| ThreadReuse::new(kv.clone(), settings.store_timeout));
            let lfg = settings.lfg.as_ref().map(|lfg| {
                info!("LFG banner channel: {}", lfg.channel_id);
                LfgBanner::new(
                    api.clone(),
                    kv.clone(),
                    lfg.channel_id,
                    lfg.message_text.clone(),
                    settings.store_timeout,
                    settings.delivery_timeout,
                )
            });
            (
                Arc::new(BotChannel::new(api.clone(), *channel_id, reuse)),
                Some(ThreadCleanup::new(api, *channel_id)),
                lfg,
            )
        }
    };

    if args.check_config {
        info!("Configuration OK");
        return Ok(());
    }

    let notifier = MatchNotifier::new(
        identity_store.clone(),
        outbound,
        settings.delivery.uses_threads(),
        settings.delivery_timeout,
    );

    let state = AppState {
        shared_secret: settings.shared_secret.clone(),
        public_key: settings.public_key,
        link_handler: LinkCommandHandler::new(identity_store),
        notifier,
        cleanup,
        lfg,
        delivery_mode: settings.delivery.name(),
    };

    let mut web_config = WebServerConfig::from_env();
    if let Some(port) = args.port {
        web_config.port = port;
    }

    if let Err(e) = start_web_server(web_config, state).await {
        error!("Web server error: {}", e);
        return Err(e);
    }

    Ok(())
}
