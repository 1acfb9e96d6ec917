//! Wikimedia Commons adapter.
//!
//! [`CommonsClient`] implements the core's title lookup, claim read, claim
//! write and category listing traits over the Commons action API.

mod client;
mod wire;

pub use client::{CommonsClient, DEFAULT_PAGE_SIZE, MAX_ENTITY_BATCH};
pub(crate) use wire::EntitiesResponse;
