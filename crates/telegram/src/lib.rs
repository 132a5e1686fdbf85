//! Telegram bot gating a group chat behind channel subscriptions.
//!
//! Uses the teloxide library to poll the Bot API: messages in the monitored
//! group are checked against the required-channel policy and removed when the
//! sender fails it, join requests are approved and answered with onboarding
//! instructions, and the admin curates a small set of links distributed as
//! self-deleting messages.

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod verify;

pub use {
    config::BotConfig,
    error::{Error, Result},
    state::{BotState, SharedState},
};
