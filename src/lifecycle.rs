//! Match lifecycle model.
//!
//! `Arena` owns the account ledger and the active match set. Every operation
//! validates first and mutates only on success, so a failed call leaves the
//! arena untouched. The arena holds no clock or RNG of its own: callers pass
//! `now`, and outcomes arrive through [`Arena::resolve_match`].

use chrono::{DateTime, Duration, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::{MIN_MATCH_ID_LEN, RETENTION_SECS};
use crate::types::{
    format_cents, tokens_to_cents, AmountCents, Balances, HistoryEntry, Match, MatchResult,
    MatchStatus, Side, UserStats, Wallet, MAX_STAKE,
};

/// Reason an arena operation was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    NotConnected,
    InvalidId { id: String },
    DuplicateId { id: String },
    InvalidStake,
    InvalidAmount,
    InsufficientBalance { required: AmountCents, available: AmountCents },
    NotFound { id: String },
    NotJoinable { id: String, status: MatchStatus },
    SelfJoin { id: String },
    NotActive { id: String, status: MatchStatus },
    NothingToWithdraw,
    /// A credit would exceed the representable balance
    AmountOverflow,
}

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArenaError::NotConnected => write!(f, "Please connect your wallet first."),
            ArenaError::InvalidId { id } => {
                write!(f, "Match ID must be at least {} characters long (got {:?}).", MIN_MATCH_ID_LEN, id)
            }
            ArenaError::DuplicateId { id } => {
                write!(f, "Match ID {:?} already exists. Please choose a different one.", id)
            }
            ArenaError::InvalidStake => write!(f, "Please select a valid stake amount."),
            ArenaError::InvalidAmount => write!(f, "Please enter a valid amount."),
            ArenaError::InsufficientBalance { required, available } => {
                write!(f, "Insufficient balance: need {}, have {}.",
                       format_cents(*required), format_cents(*available))
            }
            ArenaError::NotFound { id } => write!(f, "Match {:?} not found.", id),
            ArenaError::NotJoinable { id, status } => {
                write!(f, "Match {:?} is no longer available ({}).", id, status)
            }
            ArenaError::SelfJoin { id } => write!(f, "You cannot join your own match ({:?}).", id),
            ArenaError::NotActive { id, status } => {
                write!(f, "Match {:?} is not active ({}).", id, status)
            }
            ArenaError::NothingToWithdraw => write!(f, "No winnings to withdraw."),
            ArenaError::AmountOverflow => write!(f, "Amount exceeds the maximum balance."),
        }
    }
}

impl std::error::Error for ArenaError {}

/// One client's connection state. At most one wallet per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    wallet: Option<Wallet>,
}

impl Session {
    /// A session with no wallet attached
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }
}

/// Per-wallet ledger entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub balances: Balances,
    /// Winnings accrued but not yet withdrawn into `balances.game`
    pub pending_winnings: AmountCents,
    /// Newest first
    pub history: Vec<HistoryEntry>,
}

/// Outcome of resolving a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub match_id: String,
    pub winner: String,
    pub loser: String,
    /// Full escrow credited to the winner's pending winnings
    pub payout: AmountCents,
}

/// Arena state: account ledger plus the active match set (newest first)
#[derive(Debug, Default)]
pub struct Arena {
    accounts: FxHashMap<String, Account>,
    matches: Vec<Match>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    // === Wallet ===

    /// Attach a wallet. The account is registered with `balances` on first
    /// connect; reconnecting keeps the existing ledger.
    pub fn connect(&mut self, public_key: impl Into<String>, balances: Balances) -> Session {
        let wallet = Wallet::new(public_key);
        self.accounts
            .entry(wallet.public_key.clone())
            .or_insert_with(|| Account { balances, ..Account::default() });
        Session { wallet: Some(wallet) }
    }

    pub fn disconnect(&mut self, session: &mut Session) {
        session.wallet = None;
    }

    pub fn account(&self, public_key: &str) -> Option<&Account> {
        self.accounts.get(public_key)
    }

    /// Balances of the session's wallet; all zero when disconnected
    pub fn balances(&self, session: &Session) -> Balances {
        session.wallet()
            .and_then(|w| self.accounts.get(&w.public_key))
            .map(|a| a.balances)
            .unwrap_or_default()
    }

    pub fn pending_winnings(&self, session: &Session) -> AmountCents {
        session.wallet()
            .and_then(|w| self.accounts.get(&w.public_key))
            .map(|a| a.pending_winnings)
            .unwrap_or(0)
    }

    /// Swap stable tokens for game tokens at 1:1
    pub fn purchase_tokens(&mut self, session: &Session, amount: AmountCents) -> Result<Balances, ArenaError> {
        let account = self.connected_account_mut(session)?;
        if amount == 0 {
            return Err(ArenaError::InvalidAmount);
        }
        if amount > account.balances.stable {
            return Err(ArenaError::InsufficientBalance {
                required: amount,
                available: account.balances.stable,
            });
        }
        let game = account.balances.game.checked_add(amount).ok_or(ArenaError::AmountOverflow)?;
        account.balances.stable -= amount;
        account.balances.game = game;
        Ok(account.balances)
    }

    // === Match lifecycle ===

    /// Open a new match in WaitingForPlayer and escrow the creator's stake
    pub fn create_match(
        &mut self,
        session: &Session,
        id: &str,
        stake: AmountCents,
        now: DateTime<Utc>,
    ) -> Result<&Match, ArenaError> {
        let creator = session.wallet().ok_or(ArenaError::NotConnected)?.public_key.clone();

        if id.chars().count() < MIN_MATCH_ID_LEN {
            return Err(ArenaError::InvalidId { id: id.to_string() });
        }
        if self.find(id).is_some() {
            return Err(ArenaError::DuplicateId { id: id.to_string() });
        }
        if stake == 0 {
            return Err(ArenaError::InvalidStake);
        }
        if stake > MAX_STAKE {
            return Err(ArenaError::AmountOverflow);
        }

        let account = self.connected_account_mut(session)?;
        if stake > account.balances.game {
            return Err(ArenaError::InsufficientBalance {
                required: stake,
                available: account.balances.game,
            });
        }
        account.balances.game -= stake;

        self.matches.insert(0, Match {
            id: id.to_string(),
            creator,
            joiner: None,
            stake,
            status: MatchStatus::WaitingForPlayer,
            created_at: now,
            completed_at: None,
            winner: None,
        });
        Ok(&self.matches[0])
    }

    /// Take the second seat of a waiting match and escrow the joiner's stake
    pub fn join_match(&mut self, session: &Session, id: &str) -> Result<&Match, ArenaError> {
        let joiner = session.wallet().ok_or(ArenaError::NotConnected)?.public_key.clone();

        let idx = self.position(id).ok_or_else(|| ArenaError::NotFound { id: id.to_string() })?;
        let (status, stake, is_own) = {
            let m = &self.matches[idx];
            (m.status, m.stake, m.creator == joiner)
        };
        if status != MatchStatus::WaitingForPlayer {
            return Err(ArenaError::NotJoinable { id: id.to_string(), status });
        }
        if is_own {
            return Err(ArenaError::SelfJoin { id: id.to_string() });
        }

        let account = self.connected_account_mut(session)?;
        if stake > account.balances.game {
            return Err(ArenaError::InsufficientBalance {
                required: stake,
                available: account.balances.game,
            });
        }
        account.balances.game -= stake;

        let m = &mut self.matches[idx];
        m.status = MatchStatus::Active;
        m.joiner = Some(joiner);
        Ok(&self.matches[idx])
    }

    /// Whether the session could join `m` right now
    pub fn can_join(&self, session: &Session, m: &Match) -> bool {
        let Some(wallet) = session.wallet() else {
            return false;
        };
        m.status == MatchStatus::WaitingForPlayer
            && m.creator != wallet.public_key
            && m.stake <= self.balances(session).game
    }

    /// Settle an Active match with an authoritative outcome. The winner's
    /// pending winnings receive the full escrow; both players get a history
    /// entry.
    pub fn resolve_match(&mut self, id: &str, winner: Side, now: DateTime<Utc>) -> Result<Settlement, ArenaError> {
        let idx = self.position(id).ok_or_else(|| ArenaError::NotFound { id: id.to_string() })?;
        let m = &mut self.matches[idx];
        if m.status != MatchStatus::Active {
            return Err(ArenaError::NotActive { id: id.to_string(), status: m.status });
        }
        let Some(joiner) = m.joiner.clone() else {
            return Err(ArenaError::NotActive { id: id.to_string(), status: m.status });
        };

        let (winner_key, loser_key) = match winner {
            Side::Creator => (m.creator.clone(), joiner),
            Side::Joiner => (joiner, m.creator.clone()),
        };
        let stake = m.stake;
        let payout = m.escrow().ok_or(ArenaError::AmountOverflow)?;
        let credited = self.accounts
            .get(&winner_key)
            .map_or(0, |a| a.pending_winnings)
            .checked_add(payout)
            .ok_or(ArenaError::AmountOverflow)?;

        m.status = MatchStatus::Completed;
        m.completed_at = Some(now);
        m.winner = Some(winner);

        let winner_account = self.accounts.entry(winner_key.clone()).or_default();
        winner_account.pending_winnings = credited;
        winner_account.history.insert(0, HistoryEntry {
            match_id: id.to_string(),
            opponent: loser_key.clone(),
            stake,
            result: MatchResult::Win,
            winnings: payout,
            timestamp: now,
        });

        let loser_account = self.accounts.entry(loser_key.clone()).or_default();
        loser_account.history.insert(0, HistoryEntry {
            match_id: id.to_string(),
            opponent: winner_key.clone(),
            stake,
            result: MatchResult::Loss,
            winnings: 0,
            timestamp: now,
        });

        Ok(Settlement {
            match_id: id.to_string(),
            winner: winner_key,
            loser: loser_key,
            payout,
        })
    }

    /// Move all pending winnings into the game-token balance
    pub fn withdraw(&mut self, session: &Session) -> Result<AmountCents, ArenaError> {
        let account = self.connected_account_mut(session)?;
        if account.pending_winnings == 0 {
            return Err(ArenaError::NothingToWithdraw);
        }
        let amount = account.pending_winnings;
        account.balances.game = account.balances.game.checked_add(amount).ok_or(ArenaError::AmountOverflow)?;
        account.pending_winnings = 0;
        Ok(amount)
    }

    /// Drop matches that have been Completed for at least the retention
    /// window. Returns the removed ids; history is untouched.
    pub fn purge(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let retention = Duration::seconds(RETENTION_SECS);
        let mut removed = Vec::new();
        self.matches.retain(|m| {
            let expired = m.status == MatchStatus::Completed
                && m.completed_at.is_some_and(|at| now - at >= retention);
            if expired {
                removed.push(m.id.clone());
            }
            !expired
        });
        removed
    }

    // === Queries ===

    pub fn get(&self, id: &str) -> Option<&Match> {
        self.find(id)
    }

    /// Active set, newest first, optionally restricted to one stake level
    pub fn active_matches(&self, stake_filter: Option<AmountCents>) -> Vec<&Match> {
        self.matches
            .iter()
            .filter(|m| stake_filter.map_or(true, |s| m.stake == s))
            .collect()
    }

    pub fn history(&self, session: &Session) -> &[HistoryEntry] {
        session.wallet()
            .and_then(|w| self.accounts.get(&w.public_key))
            .map(|a| a.history.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self, session: &Session) -> UserStats {
        UserStats::from_history(self.history(session))
    }

    /// Populate the arena with a few demo players and matches: two waiting
    /// for an opponent and one already in play.
    pub fn seed_demo(&mut self, now: DateTime<Utc>) -> Result<(), ArenaError> {
        let funded = Balances {
            native: 245,
            stable: tokens_to_cents(150),
            game: tokens_to_cents(100),
        };
        let demos: [(&str, &str, u64, i64); 3] = [
            ("MATCH001", "7xK3mV2pL8qR9sT4uW6yZ1aB3cD5fG7hJ9kL2mN4", 10, 300),
            ("MATCH002", "9bM1nX4rL7sU2vY5zA8cF3gH6jK9mP1qR4tW7pQ3", 25, 150),
            ("MATCH003", "5dR8eT1wQ4yU7iO0aS3fG6hJ9kL2mN5pR8tW2kL6", 5, 600),
        ];
        for (id, creator, stake, age_secs) in demos {
            let session = self.connect(creator, funded);
            self.create_match(&session, id, tokens_to_cents(stake), now - Duration::seconds(age_secs))?;
        }

        let opponent = self.connect("8xP2nR5vL1sU8iY3zA6cF9gH2jK5mP8qR1tW4mK9", funded);
        self.join_match(&opponent, "MATCH003")?;
        Ok(())
    }

    // === Internals ===

    fn find(&self, id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.matches.iter().position(|m| m.id == id)
    }

    fn connected_account_mut(&mut self, session: &Session) -> Result<&mut Account, ArenaError> {
        let wallet = session.wallet().ok_or(ArenaError::NotConnected)?;
        Ok(self.accounts.entry(wallet.public_key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W1: &str = "W1aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1";
    const W2: &str = "W2bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2";

    fn game(tokens: u64) -> Balances {
        Balances { game: tokens_to_cents(tokens), ..Balances::default() }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_create_debits_creator_and_lists_match_once() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));

        let m = arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        assert_eq!(m.status, MatchStatus::WaitingForPlayer);

        assert_eq!(arena.balances(&s1).game, tokens_to_cents(40));
        let listed: Vec<_> = arena.active_matches(None).into_iter().filter(|m| m.id == "ABC").collect();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_create_rejects_short_id_without_mutation() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));

        let err = arena.create_match(&s1, "AB", tokens_to_cents(10), t0()).unwrap_err();
        assert!(matches!(err, ArenaError::InvalidId { .. }));
        assert!(arena.active_matches(None).is_empty());
        assert_eq!(arena.balances(&s1).game, tokens_to_cents(50));
    }

    #[test]
    fn test_create_rejects_duplicate_active_id() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));
        let s2 = arena.connect(W2, game(50));

        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        let err = arena.create_match(&s2, "ABC", tokens_to_cents(5), t0()).unwrap_err();
        assert!(matches!(err, ArenaError::DuplicateId { .. }));
        assert_eq!(arena.balances(&s2).game, tokens_to_cents(50));
    }

    #[test]
    fn test_create_validation_order() {
        let mut arena = Arena::new();
        let offline = Session::disconnected();
        assert_eq!(
            arena.create_match(&offline, "AB", 0, t0()).unwrap_err(),
            ArenaError::NotConnected
        );

        let s1 = arena.connect(W1, game(5));
        assert_eq!(arena.create_match(&s1, "ABC", 0, t0()).unwrap_err(), ArenaError::InvalidStake);
        assert_eq!(
            arena.create_match(&s1, "ABC", tokens_to_cents(6), t0()).unwrap_err(),
            ArenaError::InsufficientBalance { required: 600, available: 500 }
        );
    }

    #[test]
    fn test_self_join_rejected_regardless_of_balance() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(10));
        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();

        // Creator now has 0 GT: SelfJoin must still win over InsufficientBalance
        let err = arena.join_match(&s1, "ABC").unwrap_err();
        assert!(matches!(err, ArenaError::SelfJoin { .. }));
        assert_eq!(arena.get("ABC").unwrap().status, MatchStatus::WaitingForPlayer);
    }

    #[test]
    fn test_join_errors() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));
        let s2 = arena.connect(W2, game(5));

        assert!(matches!(arena.join_match(&s2, "NOPE").unwrap_err(), ArenaError::NotFound { .. }));

        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        assert!(matches!(
            arena.join_match(&s2, "ABC").unwrap_err(),
            ArenaError::InsufficientBalance { .. }
        ));
        assert!(!arena.can_join(&s2, arena.get("ABC").unwrap()));
        assert_eq!(arena.balances(&s2).game, tokens_to_cents(5));
        let waiting = arena.get("ABC").unwrap();
        assert_eq!(waiting.status, MatchStatus::WaitingForPlayer);
        assert_eq!(waiting.joiner, None);

        let s3 = arena.connect("W3ccccc", game(20));
        arena.join_match(&s3, "ABC").unwrap();
        assert!(matches!(
            arena.join_match(&s2, "ABC").unwrap_err(),
            ArenaError::NotJoinable { status: MatchStatus::Active, .. }
        ));
        assert_eq!(arena.balances(&s2).game, tokens_to_cents(5));
        assert_eq!(arena.balances(&s3).game, tokens_to_cents(10));
        assert_eq!(arena.get("ABC").unwrap().joiner.as_deref(), Some("W3ccccc"));
    }

    #[test]
    fn test_oversized_stake_rejected_without_mutation() {
        let mut arena = Arena::new();
        let rich = Balances { game: u64::MAX, ..Balances::default() };
        let s1 = arena.connect(W1, rich);

        assert_eq!(
            arena.create_match(&s1, "BIG", MAX_STAKE + 1, t0()).unwrap_err(),
            ArenaError::AmountOverflow
        );
        assert!(arena.get("BIG").is_none());
        assert_eq!(arena.balances(&s1).game, u64::MAX);
    }

    #[test]
    fn test_credit_overflow_leaves_state_untouched() {
        let mut arena = Arena::new();
        let rich = Balances { game: u64::MAX, stable: 100, ..Balances::default() };
        let s1 = arena.connect(W1, rich);
        let s2 = arena.connect(W2, rich);

        arena.create_match(&s1, "BIG", MAX_STAKE, t0()).unwrap();
        arena.join_match(&s2, "BIG").unwrap();
        arena.create_match(&s1, "TWO", 1, t0()).unwrap();
        arena.join_match(&s2, "TWO").unwrap();

        arena.resolve_match("BIG", Side::Creator, t0()).unwrap();
        assert_eq!(arena.pending_winnings(&s1), MAX_STAKE * 2);

        // A second payout would not fit in the pending balance
        assert_eq!(
            arena.resolve_match("TWO", Side::Creator, t0()).unwrap_err(),
            ArenaError::AmountOverflow
        );
        assert_eq!(arena.get("TWO").unwrap().status, MatchStatus::Active);
        assert_eq!(arena.pending_winnings(&s1), MAX_STAKE * 2);
        assert_eq!(arena.history(&s1).len(), 1);
        assert_eq!(arena.history(&s2).len(), 1);

        // The game balance is near full, so withdrawing must not wrap
        assert_eq!(arena.withdraw(&s1).unwrap_err(), ArenaError::AmountOverflow);
        assert_eq!(arena.pending_winnings(&s1), MAX_STAKE * 2);

        let s3 = arena.connect("W3ccccc", Balances { game: u64::MAX, stable: 100, ..Balances::default() });
        assert_eq!(arena.purchase_tokens(&s3, 100).unwrap_err(), ArenaError::AmountOverflow);
        assert_eq!(arena.balances(&s3).stable, 100);
    }

    #[test]
    fn test_full_scenario_create_join_resolve() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));
        let s2 = arena.connect(W2, game(30));

        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        assert_eq!(arena.balances(&s1).game, tokens_to_cents(40));

        assert!(arena.can_join(&s2, arena.get("ABC").unwrap()));
        let m = arena.join_match(&s2, "ABC").unwrap();
        assert_eq!(m.status, MatchStatus::Active);
        assert_eq!(arena.balances(&s2).game, tokens_to_cents(20));

        let settlement = arena.resolve_match("ABC", Side::Creator, t0()).unwrap();
        assert_eq!(settlement.winner, W1);
        assert_eq!(settlement.payout, tokens_to_cents(20));
        assert_eq!(arena.pending_winnings(&s1), tokens_to_cents(20));
        assert_eq!(arena.pending_winnings(&s2), 0);

        let h1 = arena.history(&s1);
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].result, MatchResult::Win);
        assert_eq!(h1[0].winnings, tokens_to_cents(20));
        assert_eq!(h1[0].opponent, W2);

        let h2 = arena.history(&s2);
        assert_eq!(h2[0].result, MatchResult::Loss);
        assert_eq!(h2[0].winnings, 0);

        // Completed matches are never reactivated
        assert!(matches!(
            arena.resolve_match("ABC", Side::Joiner, t0()).unwrap_err(),
            ArenaError::NotActive { status: MatchStatus::Completed, .. }
        ));
    }

    #[test]
    fn test_resolve_requires_active() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));
        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        assert!(matches!(
            arena.resolve_match("ABC", Side::Creator, t0()).unwrap_err(),
            ArenaError::NotActive { status: MatchStatus::WaitingForPlayer, .. }
        ));
        assert!(matches!(
            arena.resolve_match("XYZ", Side::Creator, t0()).unwrap_err(),
            ArenaError::NotFound { .. }
        ));
    }

    #[test]
    fn test_withdraw() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));
        let s2 = arena.connect(W2, game(30));

        assert_eq!(arena.withdraw(&s1).unwrap_err(), ArenaError::NothingToWithdraw);
        assert_eq!(arena.balances(&s1).game, tokens_to_cents(50));

        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        arena.join_match(&s2, "ABC").unwrap();
        arena.resolve_match("ABC", Side::Joiner, t0()).unwrap();

        assert_eq!(arena.withdraw(&s2).unwrap(), tokens_to_cents(20));
        assert_eq!(arena.balances(&s2).game, tokens_to_cents(40));
        assert_eq!(arena.pending_winnings(&s2), 0);
        assert_eq!(arena.withdraw(&s2).unwrap_err(), ArenaError::NothingToWithdraw);
    }

    #[test]
    fn test_purge_respects_retention_and_frees_id() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, game(50));
        let s2 = arena.connect(W2, game(50));

        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();
        arena.create_match(&s1, "WAIT", tokens_to_cents(5), t0()).unwrap();
        arena.join_match(&s2, "ABC").unwrap();
        arena.resolve_match("ABC", Side::Creator, t0()).unwrap();

        assert!(arena.purge(t0() + Duration::seconds(59)).is_empty());
        assert_eq!(arena.purge(t0() + Duration::seconds(60)), vec!["ABC".to_string()]);
        assert!(arena.get("ABC").is_none());
        assert!(arena.get("WAIT").is_some());
        assert_eq!(arena.history(&s1).len(), 1);

        arena.create_match(&s2, "ABC", tokens_to_cents(5), t0()).unwrap();
    }

    #[test]
    fn test_purchase_tokens_one_to_one() {
        let mut arena = Arena::new();
        let s1 = arena.connect(W1, Balances { stable: 1500, game: 0, native: 0 });

        let balances = arena.purchase_tokens(&s1, 1000).unwrap();
        assert_eq!(balances.stable, 500);
        assert_eq!(balances.game, 1000);
        assert!(matches!(
            arena.purchase_tokens(&s1, 600).unwrap_err(),
            ArenaError::InsufficientBalance { .. }
        ));
        assert_eq!(arena.purchase_tokens(&Session::disconnected(), 1).unwrap_err(), ArenaError::NotConnected);
    }

    #[test]
    fn test_disconnect_keeps_ledger() {
        let mut arena = Arena::new();
        let mut s1 = arena.connect(W1, game(50));
        arena.create_match(&s1, "ABC", tokens_to_cents(10), t0()).unwrap();

        arena.disconnect(&mut s1);
        assert!(!s1.is_connected());
        assert_eq!(arena.balances(&s1), Balances::default());

        let s1 = arena.connect(W1, game(999));
        assert_eq!(arena.balances(&s1).game, tokens_to_cents(40));
    }

    #[test]
    fn test_stake_filter_and_demo_seed() {
        let mut arena = Arena::new();
        arena.seed_demo(t0()).unwrap();

        assert_eq!(arena.active_matches(None).len(), 3);
        let tens = arena.active_matches(Some(tokens_to_cents(10)));
        assert_eq!(tens.len(), 1);
        assert_eq!(tens[0].id, "MATCH001");
        assert_eq!(arena.get("MATCH003").unwrap().status, MatchStatus::Active);
    }
}
