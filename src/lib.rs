//! Terminal playground for the Red (red packet) and DataLogger contracts:
//! wallet session tracking, a uniform write lifecycle and concurrent refresh.

pub mod abi;
pub mod amount;
pub mod chain;
pub mod controller;
pub mod deployment;
pub mod error;
pub mod format;
pub mod normalize;
pub mod observer;
pub mod refresh;
pub mod rpc;
pub mod session;
pub mod snapshot;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use controller::{
    ActionKind,
    ActionOutcome,
    ActionStatus,
    ContractAddresses,
    Playground,
};
pub use error::{
    ActionError,
    ChainError,
};
pub use observer::ChainChangePolicy;
