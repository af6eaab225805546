//! Core type definitions for the arena.
//!
//! Wallets, matches, history entries and derived user stats. All amounts are
//! integer cents of the respective asset (1 token = 100 cents).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Amount in cents (token × 100). Unsigned so a balance can never go negative.
pub type AmountCents = u64;

/// Largest per-player stake whose escrow still fits in [`AmountCents`]
pub const MAX_STAKE: AmountCents = AmountCents::MAX / 2;

/// Convert a whole-token amount to cents, saturating at `AmountCents::MAX`
#[inline(always)]
pub fn tokens_to_cents(tokens: u64) -> AmountCents {
    tokens.saturating_mul(100)
}

/// Render cents as a two-decimal token amount ("40.00")
pub fn format_cents(cents: AmountCents) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Abbreviate a public key for display: first 4 + "..." + last 4 chars.
/// Keys of 8 chars or fewer are returned unchanged.
pub fn short_key(public_key: &str) -> String {
    let chars: Vec<char> = public_key.chars().collect();
    if chars.len() <= 8 {
        return public_key.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

// === Wallet ===

/// Asset balances held by a wallet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Native chain coin (SOL)
    pub native: AmountCents,
    /// Stable token (USDT)
    pub stable: AmountCents,
    /// Game token (GT), the stake currency
    pub game: AmountCents,
}

/// A connected wallet. Only the public identifier lives here; balances are
/// held by the arena's account ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wallet {
    pub public_key: String,
}

impl Wallet {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self { public_key: public_key.into() }
    }

    pub fn short(&self) -> String {
        short_key(&self.public_key)
    }
}

// === Matches ===

/// Lifecycle status. Only ever advances forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    WaitingForPlayer,
    Active,
    Completed,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::WaitingForPlayer => write!(f, "WaitingForPlayer"),
            MatchStatus::Active => write!(f, "Active"),
            MatchStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Which participant won a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Creator,
    Joiner,
}

/// A wager between a creator and (once joined) a second player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Caller-supplied identifier, unique within the active set
    pub id: String,
    /// Creator's full public key
    pub creator: String,
    /// Joiner's full public key, set on join
    pub joiner: Option<String>,
    /// Per-player stake in game-token cents
    pub stake: AmountCents,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    /// Set when the match reaches Completed; drives retention
    pub completed_at: Option<DateTime<Utc>>,
    pub winner: Option<Side>,
}

impl Match {
    /// Total escrow once both players have staked. `None` only for a stake
    /// above [`MAX_STAKE`], which the arena never admits.
    #[inline(always)]
    pub fn escrow(&self) -> Option<AmountCents> {
        self.stake.checked_mul(2)
    }

    /// Whether the match is still in the active set's live statuses
    pub fn is_open(&self) -> bool {
        self.status != MatchStatus::Completed
    }

    /// Public key of the player on `side`, if present
    pub fn player(&self, side: Side) -> Option<&str> {
        match side {
            Side::Creator => Some(&self.creator),
            Side::Joiner => self.joiner.as_deref(),
        }
    }
}

// === History & stats ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchResult::Win => write!(f, "win"),
            MatchResult::Loss => write!(f, "loss"),
        }
    }
}

/// One resolved match from a single player's point of view. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub match_id: String,
    /// Opponent's full public key
    pub opponent: String,
    pub stake: AmountCents,
    pub result: MatchResult,
    /// stake × 2 on a win, 0 on a loss
    pub winnings: AmountCents,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate stats, always recomputed from history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_winnings: AmountCents,
}

impl UserStats {
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        let mut stats = UserStats::default();
        for entry in history {
            stats.total_matches += 1;
            match entry.result {
                MatchResult::Win => stats.wins += 1,
                MatchResult::Loss => stats.losses += 1,
            }
            stats.total_winnings = stats.total_winnings.saturating_add(entry.winnings);
        }
        stats
    }

    /// wins / total × 100, zero when no matches have been played
    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        self.wins as f64 / self.total_matches as f64 * 100.0
    }

    /// Win rate rounded half-up to one decimal ("66.7", 1 of 16 -> "6.3")
    pub fn win_rate_display(&self) -> String {
        if self.total_matches == 0 {
            return "0.0".to_string();
        }
        let total = self.total_matches as u64;
        let tenths = (self.wins as u64 * 2000 + total) / (2 * total);
        format!("{}.{}", tenths / 10, tenths % 10)
    }
}
