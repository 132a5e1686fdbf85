use {
    async_trait::async_trait,
    teloxide::{
        prelude::*,
        types::{ChatMemberStatus, Recipient, UserId},
    },
    tracing::{debug, warn},
};

use gatehouse_config::ProbeErrorPolicy;

use crate::error::Result;

/// Membership state reported by the platform for a user in one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Member,
    Administrator,
    Owner,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// Whether this status satisfies a channel requirement.
    pub fn satisfies(self) -> bool {
        matches!(self, Self::Member | Self::Administrator | Self::Owner)
    }
}

/// Source of membership answers, one query per (channel, user) pair.
///
/// Implemented by [`teloxide::Bot`] against the live Bot API; tests supply
/// scripted implementations.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    async fn member_status(&self, channel: &str, user: UserId) -> Result<MemberStatus>;
}

#[async_trait]
impl MembershipProvider for Bot {
    async fn member_status(&self, channel: &str, user: UserId) -> Result<MemberStatus> {
        let member = self.get_chat_member(channel_recipient(channel), user).await?;
        Ok(match member.status() {
            ChatMemberStatus::Owner => MemberStatus::Owner,
            ChatMemberStatus::Administrator => MemberStatus::Administrator,
            ChatMemberStatus::Member => MemberStatus::Member,
            ChatMemberStatus::Restricted => MemberStatus::Restricted,
            ChatMemberStatus::Left => MemberStatus::Left,
            ChatMemberStatus::Banned => MemberStatus::Banned,
        })
    }
}

/// Check a user against every required channel, in sequence order.
///
/// Empty requirements mean everyone passes. The first explicitly
/// non-satisfying status fails the whole check and stops further queries.
/// A probe error counts according to `policy`: [`ProbeErrorPolicy::Pass`]
/// logs the failure and treats the channel as satisfied, keeping the gate
/// usable while a channel is unreachable or the bot lacks access to it.
/// No result is cached; every call re-queries all requirements.
pub async fn verify_subscriptions(
    provider: &dyn MembershipProvider,
    required: &[String],
    policy: ProbeErrorPolicy,
    user: UserId,
) -> bool {
    if required.is_empty() {
        return true;
    }

    for channel in required {
        match provider.member_status(channel, user).await {
            Ok(status) if status.satisfies() => {},
            Ok(status) => {
                debug!(channel = %channel, user = user.0, ?status, "requirement not satisfied");
                return false;
            },
            Err(e) => {
                warn!(channel = %channel, user = user.0, error = %e, "membership probe failed");
                if policy == ProbeErrorPolicy::Fail {
                    return false;
                }
            },
        }
    }
    true
}

/// Resolve a stored channel identifier to an API recipient.
///
/// Numeric identifiers address the chat directly; anything else is treated
/// as a public channel handle, with or without the leading `@`.
fn channel_recipient(channel: &str) -> Recipient {
    match channel.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => {
            let handle = channel.strip_prefix('@').unwrap_or(channel);
            Recipient::ChannelUsername(format!("@{handle}"))
        },
    }
}
