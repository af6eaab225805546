//! Simulated match resolver.
//!
//! Stands in for an authoritative result source in demos and tests: every
//! tick, each Active match completes with a fixed probability and the winner
//! is a fair coin flip. Outcomes go through the regular `resolve_match`
//! command, so the arena itself never sees randomness.
//!
//! Client-local randomness is not a trustworthy way to settle real stakes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::COMPLETE_PROBABILITY;
use crate::engine::ArenaHandle;
use crate::lifecycle::{Arena, Session, Settlement};
use crate::types::{Match, MatchStatus, Side};

pub struct MatchSimulator {
    rng: StdRng,
    complete_probability: f64,
}

impl MatchSimulator {
    pub fn new(seed: u64) -> Self {
        Self::with_probability(seed, COMPLETE_PROBABILITY)
    }

    /// Non-finite probabilities are treated as 0.0
    pub fn with_probability(seed: u64, complete_probability: f64) -> Self {
        let complete_probability = if complete_probability.is_finite() {
            complete_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { rng: StdRng::seed_from_u64(seed), complete_probability }
    }

    /// Roll outcomes for the Active matches in `matches`
    pub fn pick_outcomes<'a>(&mut self, matches: impl IntoIterator<Item = &'a Match>) -> Vec<(String, Side)> {
        let mut outcomes = Vec::new();
        for m in matches {
            if m.status != MatchStatus::Active {
                continue;
            }
            if !self.rng.gen_bool(self.complete_probability) {
                continue;
            }
            let winner = if self.rng.gen_bool(0.5) { Side::Creator } else { Side::Joiner };
            outcomes.push((m.id.clone(), winner));
        }
        outcomes
    }

    /// One simulation step applied directly to an arena
    pub fn tick(&mut self, arena: &mut Arena, now: DateTime<Utc>) -> Vec<Settlement> {
        let outcomes = self.pick_outcomes(arena.active_matches(None));
        outcomes
            .into_iter()
            .filter_map(|(id, winner)| arena.resolve_match(&id, winner, now).ok())
            .collect()
    }
}

/// Drive the simulator against a running arena engine, purging expired
/// matches after every tick.
pub async fn run_simulation_loop(arena: ArenaHandle, mut simulator: MatchSimulator, tick: Duration) {
    info!("[SIM] ⚠️ Simulated resolver running every {}s (outcomes are random)", tick.as_secs());
    let observer = Session::disconnected();
    let mut interval = tokio::time::interval(tick);
    // First tick fires immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let snapshot = match arena.snapshot(&observer, None).await {
            Ok(s) => s,
            Err(e) => {
                warn!("[SIM] Arena unavailable, stopping: {}", e);
                break;
            }
        };

        for (id, winner) in simulator.pick_outcomes(&snapshot.active_matches) {
            match arena.resolve_match(&id, winner).await {
                Ok(settlement) => info!("[SIM] 🎲 {} resolved: {:?} wins", settlement.match_id, winner),
                Err(e) => warn!("[SIM] Could not resolve {}: {}", id, e),
            }
        }

        if let Err(e) = arena.purge(Utc::now()).await {
            warn!("[SIM] Purge failed: {}", e);
        }
    }
}
