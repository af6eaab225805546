//! TriX PvP wagering arena
//!
//! Match lifecycle engine (escrow, settlement, winnings) plus the HTTP
//! gateway that forwards token purchases and match calls to the ledger.

pub mod config;
pub mod engine;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod simulation;
pub mod types;
