// gachabot-core/src/services/cards.rs
//
// Rendered message payloads. Layout only; every decision about *when* to
// post lives in the reconcile engine.

use gachabot_common::models::{Banner, Card, CardField, MessageBody};

use super::reconcile::RetireReason;
use crate::probability::RankedBanner;

/// The banner card shown as the thread starter and refreshed every pass.
pub fn banner_card(banner: &Banner) -> Card {
    let mut fields = Vec::new();

    if let Some(price) = banner.price {
        fields.push(CardField::inline("Price", format!("{price} coins")));
    }
    if let (Some(current), Some(total)) = (banner.current_stock, banner.total_stock) {
        fields.push(CardField::inline("Packs", format!("{current} / {total}")));
    }
    match banner.daily_limit {
        Some(limit) if limit > 0 => {
            fields.push(CardField::inline("Per day", format!("{limit}x")));
        }
        _ => {
            fields.push(CardField::inline("Per day", "unlimited"));
        }
    }
    if let Some(best_hit) = &banner.best_hit {
        fields.push(CardField::block("Best hit", best_hit.clone()));
    }
    if let Some(end) = &banner.sale_end_date {
        fields.push(CardField::inline("Ends", end.clone()));
    }

    Card {
        title: banner
            .title
            .clone()
            .unwrap_or_else(|| format!("Pack {}", banner.pack_id)),
        url: banner.detail_url.clone(),
        fields,
        image_url: banner.image_url.clone(),
        footer: Some(format!("Pack ID: {}", banner.pack_id)),
    }
}

pub fn new_thread_body(banner: &Banner, mention: bool) -> MessageBody {
    MessageBody {
        content: mention.then(|| "@everyone".to_string()),
        card: Some(banner_card(banner)),
    }
}

pub fn card_refresh_body(banner: &Banner) -> MessageBody {
    MessageBody::card(banner_card(banner))
}

pub fn stock_change_comment(old: i32, new: i32, mention: bool) -> MessageBody {
    let prefix = if mention { "@everyone " } else { "" };
    let line = if new < old {
        format!("{prefix}Packs dropped: {old} -> {new}")
    } else {
        format!("{prefix}Packs changed: {old} -> {new}")
    };
    MessageBody::text(line)
}

pub fn probability_line(chance: f64, hits_remaining: i32) -> String {
    format!(
        "Hit chance today: **{chance:.2}%** ({hits_remaining} prize{} left)",
        if hits_remaining == 1 { "" } else { "s" }
    )
}

pub fn closing_message(reason: RetireReason) -> String {
    match reason {
        RetireReason::SoldOut => "This banner is sold out. Thread closed.".to_string(),
        RetireReason::ExpiredByAbsence => {
            "This banner is no longer listed on the storefront. Thread closed.".to_string()
        }
    }
}

/// The hot-banner board: top entries by hit chance.
pub fn ranking_message(ranked: &[RankedBanner]) -> MessageBody {
    if ranked.is_empty() {
        return MessageBody::text("No rankable banners right now.");
    }
    let mut lines = vec!["**Hot banners — best hit chances**".to_string()];
    for (i, r) in ranked.iter().enumerate() {
        let title = r.title.as_deref().unwrap_or("(untitled)");
        lines.push(format!(
            "{}. [{}] {} — {:.2}% (ID: {})",
            i + 1,
            r.category,
            title,
            r.chance,
            r.pack_id
        ));
    }
    MessageBody::text(lines.join("\n"))
}
