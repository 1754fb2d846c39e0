// gachabot-core/src/services/mod.rs

pub mod admin;
pub mod cards;
pub mod medal_service;
pub mod reconcile;
pub mod recovery;

pub use admin::AdminNotifier;
pub use medal_service::MedalService;
pub use reconcile::{ReconcileReport, ReconcileService, ReconcileSettings, RetireReason};
pub use recovery::{RecoveryReport, RecoveryService};
