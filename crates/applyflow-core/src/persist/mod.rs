//! Persistence bridge between the run registry and the durable job store.

mod bridge;

pub use bridge::{derive_flags, PersistenceBridge};
