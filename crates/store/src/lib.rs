//! Durable mutable state behind the bot: the curated link mapping and the
//! ordered list of required channels.
//!
//! Each store is a whole-document JSON file reloaded at startup and rewritten
//! synchronously on every mutation. A missing or corrupt document yields an
//! empty default, never a startup error. Mutation and persist happen under a
//! single-writer mutex; the lock is never held across an `.await`.

pub mod channels;
pub mod links;

pub use {
    channels::ChannelRequirements,
    gatehouse_common::{Error, FromMessage, Result},
    links::LinkStore,
};

gatehouse_common::impl_context!();
