//! Single-writer arena engine.
//!
//! All arena mutation funnels through one task that owns the [`Arena`] and
//! drains a bounded command queue, one command at a time in arrival order.
//! Successful mutations are published as [`ArenaEvent`]s on a broadcast
//! channel for presentation adapters.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{ARENA_EVENT_CAPACITY, ARENA_QUEUE_CAPACITY};
use crate::lifecycle::{Arena, ArenaError, Session, Settlement};
use crate::types::{format_cents, AmountCents, Balances, HistoryEntry, Match, Side, UserStats};

// =============================================================================
// COMMANDS & EVENTS
// =============================================================================

type Reply<T> = oneshot::Sender<Result<T, ArenaError>>;

/// A request to the arena task
pub enum ArenaCommand {
    Connect { public_key: String, balances: Balances, reply: oneshot::Sender<Session> },
    Disconnect { session: Session, reply: oneshot::Sender<Session> },
    PurchaseTokens { session: Session, amount: AmountCents, reply: Reply<Balances> },
    CreateMatch { session: Session, id: String, stake: AmountCents, now: DateTime<Utc>, reply: Reply<Match> },
    JoinMatch { session: Session, id: String, reply: Reply<Match> },
    ResolveMatch { id: String, winner: Side, now: DateTime<Utc>, reply: Reply<Settlement> },
    Withdraw { session: Session, reply: Reply<AmountCents> },
    Purge { now: DateTime<Utc>, reply: oneshot::Sender<Vec<String>> },
    Snapshot { session: Session, stake_filter: Option<AmountCents>, reply: oneshot::Sender<ArenaSnapshot> },
}

/// State-change notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ArenaEvent {
    WalletConnected { public_key: String },
    WalletDisconnected { public_key: String },
    TokensPurchased { public_key: String, amount: AmountCents },
    MatchCreated { created: Match },
    MatchJoined { joined: Match },
    MatchResolved { settlement: Settlement },
    WinningsWithdrawn { public_key: String, amount: AmountCents },
    MatchesPurged { ids: Vec<String> },
}

/// Read-side view of the arena for one session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaSnapshot {
    pub connected: bool,
    pub balances: Balances,
    pub pending_winnings: AmountCents,
    pub active_matches: Vec<Match>,
    pub history: Vec<HistoryEntry>,
    pub stats: UserStats,
    pub win_rate: String,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable front to the arena task
#[derive(Clone)]
pub struct ArenaHandle {
    tx: mpsc::Sender<ArenaCommand>,
    events: broadcast::Sender<ArenaEvent>,
}

impl ArenaHandle {
    /// Subscribe to state-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    async fn request<T>(&self, cmd: ArenaCommand, rx: oneshot::Receiver<T>) -> Result<T> {
        self.tx.send(cmd).await.map_err(|_| anyhow!("arena engine stopped"))?;
        rx.await.map_err(|_| anyhow!("arena engine dropped the reply"))
    }

    async fn call<T>(&self, cmd: ArenaCommand, rx: oneshot::Receiver<Result<T, ArenaError>>) -> Result<T> {
        Ok(self.request(cmd, rx).await??)
    }

    pub async fn connect(&self, public_key: impl Into<String>, balances: Balances) -> Result<Session> {
        let (reply, rx) = oneshot::channel();
        self.request(ArenaCommand::Connect { public_key: public_key.into(), balances, reply }, rx).await
    }

    pub async fn disconnect(&self, session: &mut Session) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        *session = self.request(ArenaCommand::Disconnect { session: session.clone(), reply }, rx).await?;
        Ok(())
    }

    pub async fn purchase_tokens(&self, session: &Session, amount: AmountCents) -> Result<Balances> {
        let (reply, rx) = oneshot::channel();
        self.call(ArenaCommand::PurchaseTokens { session: session.clone(), amount, reply }, rx).await
    }

    pub async fn create_match(&self, session: &Session, id: &str, stake: AmountCents) -> Result<Match> {
        let (reply, rx) = oneshot::channel();
        let cmd = ArenaCommand::CreateMatch {
            session: session.clone(),
            id: id.to_string(),
            stake,
            now: Utc::now(),
            reply,
        };
        self.call(cmd, rx).await
    }

    pub async fn join_match(&self, session: &Session, id: &str) -> Result<Match> {
        let (reply, rx) = oneshot::channel();
        self.call(ArenaCommand::JoinMatch { session: session.clone(), id: id.to_string(), reply }, rx).await
    }

    /// Submit an authoritative outcome for an Active match
    pub async fn resolve_match(&self, id: &str, winner: Side) -> Result<Settlement> {
        let (reply, rx) = oneshot::channel();
        let cmd = ArenaCommand::ResolveMatch { id: id.to_string(), winner, now: Utc::now(), reply };
        self.call(cmd, rx).await
    }

    pub async fn withdraw(&self, session: &Session) -> Result<AmountCents> {
        let (reply, rx) = oneshot::channel();
        self.call(ArenaCommand::Withdraw { session: session.clone(), reply }, rx).await
    }

    pub async fn purge(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.request(ArenaCommand::Purge { now, reply }, rx).await
    }

    pub async fn snapshot(&self, session: &Session, stake_filter: Option<AmountCents>) -> Result<ArenaSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.request(ArenaCommand::Snapshot { session: session.clone(), stake_filter, reply }, rx).await
    }
}

// =============================================================================
// ENGINE LOOP
// =============================================================================

/// Spawn the arena task. It exits once every handle has been dropped.
pub fn spawn_arena(arena: Arena) -> (ArenaHandle, JoinHandle<Arena>) {
    let (tx, rx) = mpsc::channel(ARENA_QUEUE_CAPACITY);
    let (events, _) = broadcast::channel(ARENA_EVENT_CAPACITY);
    let task = tokio::spawn(run_arena_loop(rx, arena, events.clone()));
    (ArenaHandle { tx, events }, task)
}

/// Drain commands strictly one at a time. Returns the final arena state.
pub async fn run_arena_loop(
    mut rx: mpsc::Receiver<ArenaCommand>,
    mut arena: Arena,
    events: broadcast::Sender<ArenaEvent>,
) -> Arena {
    info!("[ARENA] Engine started");

    while let Some(cmd) = rx.recv().await {
        if let Some(event) = apply(&mut arena, cmd) {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }

    info!("[ARENA] Engine stopped");
    arena
}

fn apply(arena: &mut Arena, cmd: ArenaCommand) -> Option<ArenaEvent> {
    match cmd {
        ArenaCommand::Connect { public_key, balances, reply } => {
            let session = arena.connect(public_key.clone(), balances);
            let _ = reply.send(session);
            Some(ArenaEvent::WalletConnected { public_key })
        }
        ArenaCommand::Disconnect { mut session, reply } => {
            let public_key = session.wallet().map(|w| w.public_key.clone());
            arena.disconnect(&mut session);
            let _ = reply.send(session);
            public_key.map(|public_key| ArenaEvent::WalletDisconnected { public_key })
        }
        ArenaCommand::PurchaseTokens { session, amount, reply } => {
            let result = arena.purchase_tokens(&session, amount);
            let event = result.as_ref().ok().and_then(|_| {
                session.wallet().map(|w| ArenaEvent::TokensPurchased { public_key: w.public_key.clone(), amount })
            });
            respond(reply, result, "purchase");
            event
        }
        ArenaCommand::CreateMatch { session, id, stake, now, reply } => {
            let result = arena.create_match(&session, &id, stake, now).cloned();
            let event = result.as_ref().ok().map(|m| ArenaEvent::MatchCreated { created: m.clone() });
            respond(reply, result, "create");
            event
        }
        ArenaCommand::JoinMatch { session, id, reply } => {
            let result = arena.join_match(&session, &id).cloned();
            let event = result.as_ref().ok().map(|m| ArenaEvent::MatchJoined { joined: m.clone() });
            respond(reply, result, "join");
            event
        }
        ArenaCommand::ResolveMatch { id, winner, now, reply } => {
            let result = arena.resolve_match(&id, winner, now);
            let event = result.as_ref().ok().map(|s| ArenaEvent::MatchResolved { settlement: s.clone() });
            respond(reply, result, "resolve");
            event
        }
        ArenaCommand::Withdraw { session, reply } => {
            let result = arena.withdraw(&session);
            let event = result.as_ref().ok().and_then(|amount| {
                session.wallet().map(|w| ArenaEvent::WinningsWithdrawn {
                    public_key: w.public_key.clone(),
                    amount: *amount,
                })
            });
            respond(reply, result, "withdraw");
            event
        }
        ArenaCommand::Purge { now, reply } => {
            let ids = arena.purge(now);
            let event = (!ids.is_empty()).then(|| ArenaEvent::MatchesPurged { ids: ids.clone() });
            let _ = reply.send(ids);
            event
        }
        ArenaCommand::Snapshot { session, stake_filter, reply } => {
            let stats = arena.stats(&session);
            let _ = reply.send(ArenaSnapshot {
                connected: session.is_connected(),
                balances: arena.balances(&session),
                pending_winnings: arena.pending_winnings(&session),
                active_matches: arena.active_matches(stake_filter).into_iter().cloned().collect(),
                history: arena.history(&session).to_vec(),
                stats,
                win_rate: stats.win_rate_display(),
            });
            None
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T, ArenaError>, action: &str) {
    if let Err(e) = &result {
        warn!("[ARENA] {} rejected: {}", action, e);
    }
    let _ = reply.send(result);
}

/// Presentation adapter that renders arena events into the log
pub async fn run_event_logger(mut rx: broadcast::Receiver<ArenaEvent>) {
    loop {
        match rx.recv().await {
            Ok(ArenaEvent::MatchCreated { created }) => {
                info!("[ARENA] 🆕 {} created by {} | stake={} GT",
                      created.id, crate::types::short_key(&created.creator), format_cents(created.stake));
            }
            Ok(ArenaEvent::MatchJoined { joined }) => {
                info!("[ARENA] ⚔️ {} is live | escrow={} GT", joined.id, format_cents(joined.escrow().unwrap_or(joined.stake)));
            }
            Ok(ArenaEvent::MatchResolved { settlement }) => {
                info!("[ARENA] 🏆 {} won by {} | payout={} GT",
                      settlement.match_id, crate::types::short_key(&settlement.winner),
                      format_cents(settlement.payout));
            }
            Ok(ArenaEvent::MatchesPurged { ids }) => {
                info!("[ARENA] 🧹 Purged {} completed matches: {:?}", ids.len(), ids);
            }
            Ok(event) => info!("[ARENA] {:?}", event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("[ARENA] Event logger lagged, skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{tokens_to_cents, MatchStatus};

    fn game(tokens: u64) -> Balances {
        Balances { game: tokens_to_cents(tokens), ..Balances::default() }
    }

    #[tokio::test]
    async fn test_engine_runs_full_lifecycle() {
        let (arena, task) = spawn_arena(Arena::new());
        let mut events = arena.subscribe();

        let s1 = arena.connect("W1-creator", game(50)).await.unwrap();
        let s2 = arena.connect("W2-joiner", game(30)).await.unwrap();

        let created = arena.create_match(&s1, "ABC", tokens_to_cents(10)).await.unwrap();
        assert_eq!(created.status, MatchStatus::WaitingForPlayer);
        let joined = arena.join_match(&s2, "ABC").await.unwrap();
        assert_eq!(joined.status, MatchStatus::Active);

        let settlement = arena.resolve_match("ABC", Side::Creator).await.unwrap();
        assert_eq!(settlement.payout, tokens_to_cents(20));
        assert_eq!(arena.withdraw(&s1).await.unwrap(), tokens_to_cents(20));

        let snap = arena.snapshot(&s1, None).await.unwrap();
        assert_eq!(snap.balances.game, tokens_to_cents(60));
        assert_eq!(snap.stats.wins, 1);
        assert_eq!(snap.win_rate, "100.0");

        // Events arrive in command order
        assert!(matches!(events.recv().await.unwrap(), ArenaEvent::WalletConnected { .. }));
        assert!(matches!(events.recv().await.unwrap(), ArenaEvent::WalletConnected { .. }));
        assert!(matches!(events.recv().await.unwrap(), ArenaEvent::MatchCreated { .. }));
        assert!(matches!(events.recv().await.unwrap(), ArenaEvent::MatchJoined { .. }));
        assert!(matches!(events.recv().await.unwrap(), ArenaEvent::MatchResolved { .. }));
        assert!(matches!(events.recv().await.unwrap(), ArenaEvent::WinningsWithdrawn { .. }));

        drop(arena);
        let final_state = task.await.unwrap();
        assert!(final_state.get("ABC").is_some());
    }

    #[tokio::test]
    async fn test_engine_surfaces_domain_errors() {
        let (arena, _task) = spawn_arena(Arena::new());
        let s1 = arena.connect("W1-creator", game(50)).await.unwrap();

        let err = arena.create_match(&s1, "AB", tokens_to_cents(10)).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ArenaError>(), Some(ArenaError::InvalidId { .. })));

        arena.create_match(&s1, "ABC", tokens_to_cents(10)).await.unwrap();
        let err = arena.join_match(&s1, "ABC").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ArenaError>(), Some(ArenaError::SelfJoin { .. })));

        let err = arena.withdraw(&s1).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ArenaError>(), Some(&ArenaError::NothingToWithdraw));

        let snap = arena.snapshot(&s1, None).await.unwrap();
        assert_eq!(snap.balances.game, tokens_to_cents(40));
        assert_eq!(snap.active_matches.len(), 1);
    }

    #[tokio::test]
    async fn test_engine_survives_oversized_amounts() {
        let (arena, _task) = spawn_arena(Arena::new());
        let rich = Balances { game: u64::MAX, ..Balances::default() };
        let s1 = arena.connect("W1-creator", rich).await.unwrap();
        let s2 = arena.connect("W2-joiner", rich).await.unwrap();

        let err = arena.create_match(&s1, "BIG", u64::MAX / 2 + 1).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ArenaError>(), Some(&ArenaError::AmountOverflow));

        arena.create_match(&s1, "BIG", u64::MAX / 2).await.unwrap();
        arena.join_match(&s2, "BIG").await.unwrap();
        let settlement = arena.resolve_match("BIG", Side::Joiner).await.unwrap();
        assert_eq!(settlement.payout, u64::MAX - 1);

        let snap = arena.snapshot(&s2, None).await.unwrap();
        assert_eq!(snap.pending_winnings, u64::MAX - 1);
    }

    #[tokio::test]
    async fn test_disconnect_clears_session() {
        let (arena, _task) = spawn_arena(Arena::new());
        let mut s1 = arena.connect("W1-creator", game(50)).await.unwrap();
        arena.disconnect(&mut s1).await.unwrap();
        assert!(!s1.is_connected());

        let err = arena.create_match(&s1, "ABC", 100).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ArenaError>(), Some(&ArenaError::NotConnected));
    }
}
