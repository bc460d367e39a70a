//! Core types and decision logic for the Rolo business-card store.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the card model, the normalizer, the duplicate detector, the visibility
//! rules and the lifecycle manager; storage, extraction transports and export
//! sinks plug in through the traits in [`store`], [`extract`] and [`export`].

pub mod actor;
pub mod card;
pub mod dedup;
pub mod error;
pub mod export;
pub mod extract;
pub mod lifecycle;
pub mod normalize;
pub mod store;
pub mod visibility;

mod locks;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
