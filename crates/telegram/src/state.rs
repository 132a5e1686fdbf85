use std::sync::Arc;

use gatehouse_store::{ChannelRequirements, LinkStore};

use crate::config::BotConfig;

/// Shared runtime state handed to every handler.
pub type SharedState = Arc<BotState>;

/// Process-wide bot state: the API client, runtime config, and the two
/// durable stores. The stores carry their own single-writer gates, so the
/// state itself is immutable once built.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub config: BotConfig,
    pub links: Arc<LinkStore>,
    pub channels: Arc<ChannelRequirements>,
}
