use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
}

/// How a failed membership probe (transport error, bot not admin in the
/// channel, channel not found) counts toward verification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeErrorPolicy {
    /// The unreachable channel counts as satisfied; verification continues.
    #[default]
    Pass,
    /// The unreachable channel counts as not satisfied.
    Fail,
}

/// Telegram bot account configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// User ID of the single administrator. Every restricted command and
    /// every private-chat link upsert is matched against this exact ID.
    pub admin_id: u64,

    /// Admin username (without `@`) for the "contact admin" menu button.
    pub admin_username: String,

    /// Seconds a rendered links message stays up before self-deletion.
    pub links_ttl_secs: u64,

    /// What a failed membership probe counts as.
    pub probe_error_policy: ProbeErrorPolicy,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("admin_id", &self.admin_id)
            .field("admin_username", &self.admin_username)
            .field("links_ttl_secs", &self.links_ttl_secs)
            .field("probe_error_policy", &self.probe_error_policy)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            admin_id: 0,
            admin_username: String::new(),
            links_ttl_secs: 30,
            probe_error_policy: ProbeErrorPolicy::default(),
        }
    }
}

/// Paths of the two durable documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Flat `{name: url}` mapping of curated links.
    pub links_path: PathBuf,
    /// `{"required_channels": [...]}` document defining the gating policy.
    pub channels_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            links_path: PathBuf::from("links.json"),
            channels_path: PathBuf::from("channels.json"),
        }
    }
}
