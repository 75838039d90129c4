//! Raffle countdowns: deadline storage and the ticking engine.
//!
//! A countdown entry is the only piece of client-owned durable state: an
//! absolute deadline per raffle, kept so a countdown survives restarts.

mod engine;
mod models;
mod repository;
mod store;

pub use engine::CountdownEngine;
pub use models::{CountdownEvent, CountdownKey, CountdownState};
pub use repository::CountdownRepository;
pub use store::{CountdownStore, InMemoryCountdownStore, PersistentCountdownStore};
