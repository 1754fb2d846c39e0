// gachabot-core/src/services/recovery.rs
//
// Startup recovery: rebuild thread bindings (and placeholder banners) from
// the live thread listing when the local store has lost them. Runs once
// before the first scheduled pass and is safe to run again at any time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use gachabot_common::models::{Banner, ThreadBinding, ThreadInfo};
use gachabot_common::traits::repository_traits::{BannerRepository, ThreadBindingRepository};
use gachabot_common::traits::Notifier;
use gachabot_common::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub rebuilt: u32,
    pub already_bound: u32,
    /// Threads whose titles do not match the structured pattern; not ours.
    pub unmatched: u32,
}

pub struct RecoveryService {
    banners: Arc<dyn BannerRepository>,
    bindings: Arc<dyn ThreadBindingRepository>,
    notifier: Arc<dyn Notifier>,
    channel_ids: HashMap<String, i64>,
}

impl RecoveryService {
    pub fn new(
        banners: Arc<dyn BannerRepository>,
        bindings: Arc<dyn ThreadBindingRepository>,
        notifier: Arc<dyn Notifier>,
        channel_ids: HashMap<String, i64>,
    ) -> Self {
        Self {
            banners,
            bindings,
            notifier,
            channel_ids,
        }
    }

    /// Walks every category channel, active and archived threads included,
    /// and synthesizes missing store rows. Idempotent: a second run over a
    /// populated store changes nothing and binds nothing twice.
    pub async fn rebuild_from_notifier(&self) -> Result<RecoveryReport, Error> {
        let mut report = RecoveryReport::default();

        for (category, channel_id) in &self.channel_ids {
            let threads = match self.notifier.list_threads(*channel_id, true).await {
                Ok(t) => t,
                Err(e) => {
                    warn!("category '{category}' (channel {channel_id}): thread listing failed: {e}");
                    continue;
                }
            };
            for t in &threads {
                self.recover_thread(category, *channel_id, t, &mut report)
                    .await?;
            }
        }

        info!(
            "recovery: {} bindings rebuilt, {} already known, {} foreign threads",
            report.rebuilt, report.already_bound, report.unmatched
        );
        Ok(report)
    }

    async fn recover_thread(
        &self,
        category: &str,
        channel_id: i64,
        t: &ThreadInfo,
        report: &mut RecoveryReport,
    ) -> Result<(), Error> {
        let Some(parsed) = parse_thread_title(&t.name) else {
            report.unmatched += 1;
            return Ok(());
        };

        if self.bindings.get_by_thread(t.thread_id).await?.is_some() {
            report.already_bound += 1;
            return Ok(());
        }
        if self.bindings.get_by_banner(parsed.pack_id).await?.is_some() {
            warn!(
                "pack {}: already bound to a different thread; skipping thread {}",
                parsed.pack_id, t.thread_id
            );
            report.already_bound += 1;
            return Ok(());
        }

        if self.banners.get(parsed.pack_id).await?.is_none() {
            self.banners
                .upsert(&synthesize_banner(category, &parsed))
                .await?;
        }

        // Forum starter messages share the thread's id.
        let mut binding = ThreadBinding::new(parsed.pack_id, t.thread_id, channel_id, t.thread_id);
        binding.is_expired = parsed.expired;
        match self.bindings.create(&binding).await {
            Ok(()) => report.rebuilt += 1,
            Err(Error::Duplicate(_)) => report.already_bound += 1,
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// A banner reconstructed from a thread title alone. `current_stock` stays
/// NULL — explicitly unknown — which keeps the engine from announcing a
/// phantom stock change when the next snapshot supplies a real value.
/// Threads already marked ended come back in their terminal state.
fn synthesize_banner(category: &str, parsed: &ParsedTitle) -> Banner {
    let now = Utc::now();
    Banner {
        pack_id: parsed.pack_id,
        category: category.to_string(),
        title: None,
        best_hit: parsed.best_hit.clone(),
        price: parsed.price,
        current_stock: None,
        total_stock: parsed.total_stock,
        daily_limit: parsed.daily_limit,
        sale_end_date: None,
        image_url: None,
        detail_url: None,
        is_active: !parsed.expired,
        not_found_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTitle {
    pack_id: i64,
    price: Option<i32>,
    best_hit: Option<String>,
    daily_limit: Option<i32>,
    total_stock: Option<i32>,
    expired: bool,
}

/// Parses `ID: <pack_id> / <price>c <best hit> / x<limit|∞> / <total>`,
/// optionally prefixed with `[ENDED] `. Only the pack_id is required; the
/// trailing segments survive Discord's 100-character title truncation
/// gracefully because the id comes first.
fn parse_thread_title(name: &str) -> Option<ParsedTitle> {
    let (expired, rest) = match name.strip_prefix("[ENDED] ") {
        Some(r) => (true, r),
        None => (false, name),
    };
    let rest = rest.strip_prefix("ID: ")?;
    let mut segments = rest.split(" / ");

    let pack_id: i64 = segments.next()?.trim().parse().ok()?;

    let mut price = None;
    let mut best_hit = None;
    if let Some(seg) = segments.next() {
        let seg = seg.trim();
        let (price_part, hit_part) = seg.split_once(' ').unwrap_or((seg, ""));
        if let Some(digits) = price_part.strip_suffix('c') {
            price = digits.parse().ok();
        }
        if !hit_part.is_empty() && hit_part != "Unknown" {
            best_hit = Some(hit_part.to_string());
        }
    }

    let mut daily_limit = None;
    if let Some(seg) = segments.next() {
        if let Some(v) = seg.trim().strip_prefix('x') {
            if v != "∞" {
                daily_limit = v.parse::<i32>().ok().filter(|n| *n > 0);
            }
        }
    }

    let mut total_stock = None;
    if let Some(seg) = segments.next() {
        total_stock = seg.trim().parse().ok();
    }

    Some(ParsedTitle {
        pack_id,
        price,
        best_hit,
        daily_limit,
        total_stock,
        expired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_title() {
        let parsed = parse_thread_title("ID: 4711 / 300c Chase Card / x3 / 500").unwrap();
        assert_eq!(parsed.pack_id, 4711);
        assert_eq!(parsed.price, Some(300));
        assert_eq!(parsed.best_hit.as_deref(), Some("Chase Card"));
        assert_eq!(parsed.daily_limit, Some(3));
        assert_eq!(parsed.total_stock, Some(500));
        assert!(!parsed.expired);
    }

    #[test]
    fn parses_unlimited_and_unknown_hit() {
        let parsed = parse_thread_title("ID: 12 / 0c Unknown / x∞ / 100").unwrap();
        assert_eq!(parsed.daily_limit, None);
        assert_eq!(parsed.best_hit, None);
    }

    #[test]
    fn parses_ended_prefix() {
        let parsed = parse_thread_title("[ENDED] ID: 99 / 100c Foo / x1 / 50").unwrap();
        assert!(parsed.expired);
        assert_eq!(parsed.pack_id, 99);
    }

    #[test]
    fn rejects_foreign_titles() {
        assert!(parse_thread_title("general chat").is_none());
        assert!(parse_thread_title("ID: not-a-number / rest").is_none());
        assert!(parse_thread_title("").is_none());
    }

    #[test]
    fn survives_truncated_tail() {
        let parsed = parse_thread_title("ID: 31337 / 250c Very Long Car").unwrap();
        assert_eq!(parsed.pack_id, 31337);
        assert_eq!(parsed.price, Some(250));
        assert_eq!(parsed.daily_limit, None);
        assert_eq!(parsed.total_stock, None);
    }

    #[test]
    fn round_trips_the_format() {
        let banner = synthesize_banner(
            "Pokémon",
            &ParsedTitle {
                pack_id: 777,
                price: Some(120),
                best_hit: Some("Foil".into()),
                daily_limit: Some(2),
                total_stock: Some(300),
                expired: false,
            },
        );
        let parsed = parse_thread_title(&banner.thread_title()).unwrap();
        assert_eq!(parsed.pack_id, 777);
        assert_eq!(parsed.price, Some(120));
        assert_eq!(parsed.daily_limit, Some(2));
        assert_eq!(parsed.total_stock, Some(300));
    }
}
