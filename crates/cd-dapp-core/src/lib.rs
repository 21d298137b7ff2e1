//! Crypto Devs mint page logic, independent of how the page is delivered.
//!
//! `Dapp` owns the contract bindings and the shared page state; the poller
//! drives its read operations on a timer and the HTTP layer drives its
//! actions. `render_branch` turns state into the one call-to-action shown.

pub mod controller;
pub mod poller;
pub mod presale;
pub mod state;
pub mod view;

pub use controller::{Dapp, MINT_SUCCESS_MESSAGE};
pub use poller::{DEFAULT_POLL_INTERVAL, PollerHandle, mount, spawn_pollers};
pub use presale::{Clock, ManualClock, SystemClock, presale_has_ended};
pub use state::{DappState, Session, SharedState};
pub use view::{ViewFlags, render_branch};
