// gachabot-core/src/config.rs
//
// Environment-driven configuration. Every knob has a default except the
// Discord token, guild id, and database URL.

use std::collections::HashMap;
use std::time::Duration;

use gachabot_common::Error;

/// Storefront categories with a dedicated forum channel each.
pub const CATEGORIES: [&str; 7] = [
    "Bonus",
    "MIX",
    "Yu-Gi-Oh!",
    "Pokémon",
    "Weiss Schwarz",
    "One piece",
    "Hobby",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub guild_id: u64,
    pub database_url: String,
    pub base_url: String,
    /// Endpoint serving the normalized pack listing.
    pub snapshot_endpoint: String,

    /// Category name -> forum channel id. Categories with no configured
    /// channel are absent from the map.
    pub channel_ids: HashMap<String, i64>,
    pub admin_channel_id: Option<i64>,

    pub scrape_interval: Duration,
    pub scrape_timeout: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub trigger_grace: Duration,

    pub min_viable_snapshot: usize,
    pub not_found_threshold: i32,

    pub mention_on_new_thread: bool,
    pub mention_on_stock_update: bool,
    pub notify_errors_only: bool,

    pub hot_banner_enabled: bool,
    pub hot_banner_channel_id: Option<i64>,
    pub hot_banner_exclude_category: String,
    pub hot_banner_interval: Duration,

    pub notifier_ops_per_second: f64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        let discord_token = require("DISCORD_TOKEN")?;
        let guild_id = require("GUILD_ID")?
            .parse::<u64>()
            .map_err(|_| Error::Config("GUILD_ID is not a valid id".into()))?;
        let database_url = require("DATABASE_URL")?;

        let channel_vars = [
            ("Bonus", "CHANNEL_BONUS"),
            ("MIX", "CHANNEL_MIX"),
            ("Yu-Gi-Oh!", "CHANNEL_YUGIOH"),
            ("Pokémon", "CHANNEL_POKEMON"),
            ("Weiss Schwarz", "CHANNEL_WEISS_SCHWARZ"),
            ("One piece", "CHANNEL_ONE_PIECE"),
            ("Hobby", "CHANNEL_HOBBY"),
        ];
        let mut channel_ids = HashMap::new();
        for (category, var) in channel_vars {
            if let Some(id) = opt_i64(var) {
                channel_ids.insert(category.to_string(), id);
            }
        }

        let base_url = env_or("BASE_URL", "https://gtchaxonline.com");
        let snapshot_endpoint =
            env_or("SNAPSHOT_ENDPOINT", &format!("{base_url}/api/packs"));

        Ok(Self {
            discord_token,
            guild_id,
            database_url,
            base_url,
            snapshot_endpoint,
            channel_ids,
            admin_channel_id: opt_i64("ADMIN_CHANNEL_ID"),
            scrape_interval: Duration::from_secs(env_u64("SCRAPE_INTERVAL_MINUTES", 5) * 60),
            scrape_timeout: Duration::from_secs(env_u64("SCRAPE_TIMEOUT_SECONDS", 180)),
            retry_delay: Duration::from_secs(env_u64("SCRAPE_RETRY_DELAY_SECONDS", 30)),
            max_retries: env_u64("SCRAPE_MAX_RETRIES", 2) as u32,
            trigger_grace: Duration::from_secs(env_u64("TRIGGER_GRACE_SECONDS", 300)),
            min_viable_snapshot: env_u64("MIN_VIABLE_SNAPSHOT", 60) as usize,
            not_found_threshold: env_u64("NOT_FOUND_THRESHOLD", 20) as i32,
            mention_on_new_thread: env_bool("MENTION_ON_NEW_THREAD", true),
            mention_on_stock_update: env_bool("MENTION_ON_PACK_UPDATE", true),
            notify_errors_only: env_bool("DISCORD_NOTIFY_ERRORS_ONLY", false),
            hot_banner_enabled: env_bool("HOT_BANNER_ENABLED", false),
            hot_banner_channel_id: opt_i64("HOT_BANNER_CHANNEL_ID"),
            hot_banner_exclude_category: env_or("HOT_BANNER_EXCLUDE_CATEGORY", "Bonus"),
            hot_banner_interval: Duration::from_secs(env_u64("HOT_BANNER_INTERVAL_MINUTES", 30) * 60),
            notifier_ops_per_second: 2.0,
        })
    }

    pub fn channel_for(&self, category: &str) -> Option<i64> {
        self.channel_ids.get(category).copied()
    }
}

fn require(name: &str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::Config(format!("{name} is not set")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

/// Returns None for unset, empty, or zero values ("0" means "not
/// configured" for channel ids).
fn opt_i64(name: &str) -> Option<i64> {
    let id = std::env::var(name).ok()?.parse::<i64>().ok()?;
    (id != 0).then_some(id)
}
