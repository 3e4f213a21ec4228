//! In-memory implementations for tests and the demo binary.
//!
//! **WARNING**: Do NOT use in production.

pub mod chain;

pub use chain::{InMemoryChain, DEPLOYER_ADDRESS, MARKETPLACE_ADDRESS};
