//! Remote collaborators: the store's library, search, review and app-list
//! endpoints, the compatibility-tier service and the published offline
//! dictionary.
//!
//! [`SteamApi`] is the seam the rest of the workspace depends on.
//! [`SteamClient`] talks HTTP; with the `mock` feature, [`mock::MockSteam`]
//! serves scripted responses and counts calls.

pub mod api;
pub mod client;
pub mod parse;
pub mod types;

#[cfg(feature = "mock")]
pub mod mock;

pub use api::SteamApi;
pub use client::{Endpoints, SteamClient};
pub use types::{AppListEntry, SearchHit};
