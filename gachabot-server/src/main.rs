use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use twilight_http::Client as HttpClient;

use gachabot_common::models::{Card, CardField, MessageBody};
use gachabot_common::traits::repository_traits::{
    BannerRepository, MedalRepository, ThreadBindingRepository,
};
use gachabot_common::traits::{Notifier, SnapshotSource};
use gachabot_core::config::AppConfig;
use gachabot_core::platforms::discord::{start_gateway, DiscordNotifier, InboundMessage};
use gachabot_core::repositories::postgres::{
    PostgresBannerRepository, PostgresMedalRepository, PostgresPackHistoryRepository,
    PostgresThreadBindingRepository,
};
use gachabot_core::services::{
    AdminNotifier, MedalService, ReconcileService, ReconcileSettings, RecoveryService,
};
use gachabot_core::snapshot::HttpSnapshotSource;
use gachabot_core::tasks::{
    spawn_hot_banner_task, spawn_scrape_task, HotBannerBoard, ScrapeJobRunner, ScrapeJobSettings,
};
use gachabot_core::Database;

#[derive(Parser, Debug, Clone)]
#[command(name = "gachabot")]
#[command(author, version, about = "Storefront banner watcher with Discord threads and a claim game")]
struct Args {
    /// Path to a .env file loaded before reading configuration
    #[arg(long)]
    env_file: Option<String>,

    /// Postgres connection URL (overrides DATABASE_URL)
    #[arg(long)]
    db_url: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("gachabot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path).ok();
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    init_tracing();

    let mut config = AppConfig::from_env()?;
    if let Some(url) = args.db_url {
        config.database_url = url;
    }

    info!("gachabot starting...");
    if let Err(e) = run_server(config).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("gachabot stopped. Goodbye!");
    Ok(())
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    // 1) Database.
    let db = Database::new(&config.database_url).await?;
    db.migrate().await?;

    let banners: Arc<dyn BannerRepository> =
        Arc::new(PostgresBannerRepository::new(db.pool().clone()));
    let bindings: Arc<dyn ThreadBindingRepository> =
        Arc::new(PostgresThreadBindingRepository::new(db.pool().clone()));
    let medals: Arc<dyn MedalRepository> =
        Arc::new(PostgresMedalRepository::new(db.pool().clone()));
    let history = Arc::new(PostgresPackHistoryRepository::new(db.pool().clone()));

    // 2) Discord actuation surface; everything downstream gets it injected.
    let http = Arc::new(HttpClient::new(config.discord_token.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(DiscordNotifier::new(
        http.clone(),
        config.guild_id,
        config.channel_ids.clone(),
        config.notifier_ops_per_second,
    ));
    let admin = Arc::new(AdminNotifier::new(
        notifier.clone(),
        config.admin_channel_id,
        config.notify_errors_only,
    ));

    let reconciler = Arc::new(ReconcileService::new(
        banners.clone(),
        bindings.clone(),
        medals.clone(),
        history,
        notifier.clone(),
        admin.clone(),
        config.channel_ids.clone(),
        ReconcileSettings {
            min_viable_snapshot: config.min_viable_snapshot,
            not_found_threshold: config.not_found_threshold,
            mention_on_new_thread: config.mention_on_new_thread,
            mention_on_stock_update: config.mention_on_stock_update,
        },
    ));
    let medal_service = Arc::new(MedalService::new(
        medals.clone(),
        bindings.clone(),
        notifier.clone(),
    ));

    // 3) Recovery before the first scheduled pass: rebuild whatever the
    //    store lost from the live thread list, then backfill medals from
    //    the marker reactions.
    let recovery = RecoveryService::new(
        banners.clone(),
        bindings.clone(),
        notifier.clone(),
        config.channel_ids.clone(),
    );
    recovery.rebuild_from_notifier().await?;
    resync_all_medals(&banners, &bindings, &medal_service).await;

    // 4) Scheduler.
    let source: Arc<dyn SnapshotSource> =
        Arc::new(HttpSnapshotSource::new(config.snapshot_endpoint.clone()));
    let runner = Arc::new(ScrapeJobRunner::new(
        source,
        reconciler,
        banners.clone(),
        admin.clone(),
        ScrapeJobSettings {
            timeout: config.scrape_timeout,
            retry_delay: config.retry_delay,
            max_retries: config.max_retries,
        },
    ));
    let _scrape_handle =
        spawn_scrape_task(runner.clone(), config.scrape_interval, config.trigger_grace);

    if config.hot_banner_enabled {
        if let Some(channel_id) = config.hot_banner_channel_id {
            let board = Arc::new(HotBannerBoard::new(
                banners.clone(),
                bindings.clone(),
                medals.clone(),
                notifier.clone(),
                channel_id,
                config.hot_banner_exclude_category.clone(),
            ));
            let _board_handle = spawn_hot_banner_task(board, config.hot_banner_interval);
        }
    }

    // 5) Gateway + first scrape shortly after startup.
    let (mut rx, _gateway_tasks) = start_gateway(http.clone(), config.discord_token.clone()).await?;
    admin.bot_started().await;
    {
        let runner = runner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            runner.run_scrape_job().await;
        });
    }

    // 6) Main loop: inbound messages interleave with the scheduled passes.
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Ctrl-C detected; shutting down.");
                break;
            }
            maybe_msg = rx.recv() => {
                let Some(msg) = maybe_msg else {
                    warn!("gateway stream ended");
                    break;
                };
                handle_message(msg, &runner, &medal_service, &notifier, &banners, &bindings, &medals).await;
            }
        }
    }

    admin.bot_stopped().await;
    Ok(())
}

/// Backfill medals from marker reactions for every live binding. Claim
/// history lost with the store comes back with sentinel ownership.
async fn resync_all_medals(
    banners: &Arc<dyn BannerRepository>,
    bindings: &Arc<dyn ThreadBindingRepository>,
    medal_service: &Arc<MedalService>,
) {
    let active = match banners.list_active().await {
        Ok(b) => b,
        Err(e) => {
            warn!("medal resync skipped, could not list banners: {e}");
            return;
        }
    };
    for banner in active {
        let binding = match bindings.get_by_banner(banner.pack_id).await {
            Ok(Some(b)) if !b.is_expired => b,
            Ok(_) => continue,
            Err(e) => {
                warn!("pack {}: medal resync lookup failed: {e}", banner.pack_id);
                continue;
            }
        };
        if let Err(e) = medal_service.resync_from_reactions(&binding).await {
            warn!("thread {}: medal resync failed: {e}", binding.thread_id);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_message(
    msg: InboundMessage,
    runner: &Arc<ScrapeJobRunner>,
    medal_service: &Arc<MedalService>,
    notifier: &Arc<dyn Notifier>,
    banners: &Arc<dyn BannerRepository>,
    bindings: &Arc<dyn ThreadBindingRepository>,
    medals: &Arc<dyn MedalRepository>,
) {
    match msg.content.trim() {
        // Manual trigger goes through the exact same entry point as the
        // scheduler tick.
        "!refresh" => {
            info!("manual scrape trigger from {}", msg.author_name);
            let runner = runner.clone();
            let notifier = notifier.clone();
            let channel_id = msg.channel_id;
            tokio::spawn(async move {
                let reply = match runner.run_scrape_job().await {
                    Some(report) => format!(
                        "Scrape finished: {} new, {} retired.",
                        report.new,
                        report.retired_soldout + report.retired_expired
                    ),
                    None => "Scrape skipped or failed; see the admin channel.".to_string(),
                };
                if let Err(e) = notifier
                    .post_message(channel_id, &MessageBody::text(reply))
                    .await
                {
                    warn!("could not answer !refresh: {e}");
                }
            });
        }
        "!status" => {
            let total_banners = banners.count_active().await.unwrap_or(0);
            let active_threads = bindings.count_unexpired().await.unwrap_or(0);
            let total_medals = medals.count().await.unwrap_or(0);
            let body = MessageBody {
                content: None,
                card: Some(Card {
                    title: "gachabot status".to_string(),
                    fields: vec![
                        CardField::inline("Active banners", total_banners.to_string()),
                        CardField::inline("Active threads", active_threads.to_string()),
                        CardField::inline("Medals", total_medals.to_string()),
                    ],
                    ..Card::default()
                }),
            };
            if let Err(e) = notifier.post_message(msg.channel_id, &body).await {
                warn!("could not answer !status: {e}");
            }
        }
        _ => {
            if let Err(e) = medal_service
                .handle_claim_message(msg.channel_id, msg.author_id, &msg.content)
                .await
            {
                if !e.is_duplicate() {
                    warn!("claim handling failed in channel {}: {e}", msg.channel_id);
                }
            }
        }
    }
}
