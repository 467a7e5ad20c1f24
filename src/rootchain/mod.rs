//! Rootchain (L1) contract client.

pub mod bridge;
pub mod client;

pub use bridge::{Deposit, DepositLookup, ExitOpts, ExitSubmission, MockBridge, RootchainBridge};
pub use client::Web3Bridge;
