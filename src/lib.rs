//! Pix Diário is the state and authorization store of a small
//! referral/bonus-event platform: users ask to join cash-bonus events, an
//! administrator approves or rejects them, and a multi-step payout/payback
//! cycle is tracked per request.
//!
//! There is no server. Every collection lives in a pluggable key-value blob
//! store ([`storage`]) owned by a single [`Store`] per open session ("tab"),
//! and concurrently open sessions converge through storage-change notices
//! ([`sync`]). Route access is derived from the session by [`guard`].

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod model;
pub mod storage;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use error::{Result, StoreError};
pub use store::Store;
