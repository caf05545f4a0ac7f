pub mod artifacts;
pub mod bytecode;
pub mod chain;
pub mod config;
pub mod custody;
pub mod envelope;
pub mod error;
pub mod io;
pub mod ledger;
pub mod proposal;
pub mod retry;
pub mod runner;
pub mod types;
pub mod verify;

pub use error::{Result, RolloutError};
