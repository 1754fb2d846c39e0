// File: gachabot-common/src/models/medal.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three rank-ordered prize slots per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MedalTier {
    T1,
    T2,
    T3,
}

impl MedalTier {
    pub const ALL: [MedalTier; 3] = [MedalTier::T1, MedalTier::T2, MedalTier::T3];

    /// Parses a claim message ("t1", " T2 ", ...). Anything else is not a
    /// claim attempt.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T1" => Some(MedalTier::T1),
            "T2" => Some(MedalTier::T2),
            "T3" => Some(MedalTier::T3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MedalTier::T1 => "T1",
            MedalTier::T2 => "T2",
            MedalTier::T3 => "T3",
        }
    }

    /// Marker emoji used both for the congratulation reaction and for
    /// reaction-based resync.
    pub fn emoji(&self) -> &'static str {
        match self {
            MedalTier::T1 => "🥇",
            MedalTier::T2 => "🥈",
            MedalTier::T3 => "🥉",
        }
    }

    pub fn from_emoji(e: &str) -> Option<Self> {
        match e {
            "🥇" => Some(MedalTier::T1),
            "🥈" => Some(MedalTier::T2),
            "🥉" => Some(MedalTier::T3),
            _ => None,
        }
    }
}

impl std::fmt::Display for MedalTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's claim on one tier of one thread. Unique on (thread_id, tier),
/// immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medal {
    pub id: Uuid,
    pub thread_id: i64,
    pub tier: MedalTier,
    /// Sentinel 0 marks a medal recovered from reactions, where the actual
    /// claimant is unknown.
    pub user_id: i64,
    pub claimed_at: DateTime<Utc>,
}

impl Medal {
    /// User id recorded when a medal is resynthesized from a marker reaction.
    pub const UNKNOWN_USER: i64 = 0;

    pub fn new(thread_id: i64, tier: MedalTier, user_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            tier,
            user_id,
            claimed_at: Utc::now(),
        }
    }
}

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed { user_id: i64 },
}
