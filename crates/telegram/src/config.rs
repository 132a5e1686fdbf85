use std::time::Duration;

use {
    secrecy::Secret,
    teloxide::types::UserId,
};

use gatehouse_config::{ProbeErrorPolicy, TelegramConfig};

/// Runtime configuration for the bot.
///
/// Built from the persisted [`TelegramConfig`] once at startup; the typed
/// fields (`UserId`, `Duration`) are what the handlers actually work with.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// The single administrator. Restricted commands and private-chat link
    /// upserts are matched against this exact identity.
    pub admin_id: UserId,

    /// Admin username (without `@`) for the "contact admin" menu button.
    pub admin_username: String,

    /// How long a rendered links message stays up before self-deletion.
    pub links_ttl: Duration,

    /// What a failed membership probe counts as.
    pub probe_error_policy: ProbeErrorPolicy,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"[REDACTED]")
            .field("admin_id", &self.admin_id)
            .field("admin_username", &self.admin_username)
            .field("links_ttl", &self.links_ttl)
            .field("probe_error_policy", &self.probe_error_policy)
            .finish()
    }
}

impl From<TelegramConfig> for BotConfig {
    fn from(cfg: TelegramConfig) -> Self {
        Self {
            token: cfg.token,
            admin_id: UserId(cfg.admin_id),
            admin_username: cfg.admin_username,
            links_ttl: Duration::from_secs(cfg.links_ttl_secs),
            probe_error_policy: cfg.probe_error_policy,
        }
    }
}
