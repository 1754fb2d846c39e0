// gachabot-core/src/services/admin.rs
//
// Admin-channel notifications. Failures here are logged and swallowed: a
// broken admin channel must never take down a reconcile pass.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use gachabot_common::models::{Card, CardField, MessageBody};
use gachabot_common::traits::Notifier;

use super::reconcile::ReconcileReport;

pub struct AdminNotifier {
    notifier: Arc<dyn Notifier>,
    admin_channel_id: Option<i64>,
    /// When set, success-class notifications are suppressed and only
    /// errors/warnings go out.
    errors_only: bool,
}

impl AdminNotifier {
    pub fn new(notifier: Arc<dyn Notifier>, admin_channel_id: Option<i64>, errors_only: bool) -> Self {
        Self {
            notifier,
            admin_channel_id,
            errors_only,
        }
    }

    /// A notifier with no admin channel; every call is a no-op.
    pub fn disabled(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(notifier, None, false)
    }

    async fn send(&self, title: &str, description: String, fields: Vec<CardField>) {
        let Some(channel_id) = self.admin_channel_id else {
            debug!("no admin channel configured; dropping notification '{title}'");
            return;
        };
        let body = MessageBody {
            content: Some(description),
            card: Some(Card {
                title: title.to_string(),
                fields,
                footer: Some("gachabot".to_string()),
                ..Card::default()
            }),
        };
        if let Err(e) = self.notifier.post_message(channel_id, &body).await {
            warn!("failed to send admin notification '{title}': {e}");
        }
    }

    pub async fn scrape_error(&self, error_type: &str, details: &str, attempt: u32, max_attempts: u32) {
        let fields = vec![CardField::inline(
            "Attempt",
            format!("{}/{}", attempt + 1, max_attempts + 1),
        )];
        self.send(&format!("Scrape error: {error_type}"), details.to_string(), fields)
            .await;
    }

    pub async fn all_retries_failed(&self) {
        self.send(
            "All scrape attempts failed",
            "The scrape job did not complete after every retry. Check the system.".to_string(),
            Vec::new(),
        )
        .await;
    }

    pub async fn low_banner_count(&self, found: usize, minimum: usize) {
        self.send(
            "Few banners found",
            format!(
                "Only **{found}** banners found (minimum: {minimum}). \
                 Absence tracking was skipped for this pass."
            ),
            vec![
                CardField::inline("Found", found.to_string()),
                CardField::inline("Minimum", minimum.to_string()),
            ],
        )
        .await;
    }

    pub async fn scrape_success(&self, report: &ReconcileReport, duration: Duration, total_active: i64) {
        if self.errors_only {
            return;
        }
        let mut changes = Vec::new();
        if report.new > 0 {
            changes.push(format!("+{} new", report.new));
        }
        if report.retired_soldout > 0 {
            changes.push(format!("-{} sold out", report.retired_soldout));
        }
        if report.retired_expired > 0 {
            changes.push(format!("-{} expired", report.retired_expired));
        }
        let description = if changes.is_empty() {
            "No changes".to_string()
        } else {
            format!("**Changes:** {}", changes.join(", "))
        };
        self.send(
            "Scrape finished",
            description,
            vec![
                CardField::inline("Duration", format!("{:.1}s", duration.as_secs_f64())),
                CardField::inline("Total active", total_active.to_string()),
            ],
        )
        .await;
    }

    pub async fn bot_started(&self) {
        if self.errors_only {
            return;
        }
        self.send("Bot started", "gachabot is online and ready.".to_string(), Vec::new())
            .await;
    }

    pub async fn bot_stopped(&self) {
        if self.errors_only {
            return;
        }
        self.send("Bot stopping", "gachabot is shutting down.".to_string(), Vec::new())
            .await;
    }
}
