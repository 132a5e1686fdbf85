use std::{collections::BTreeMap, time::Duration};

use {
    teloxide::{
        payloads::{AnswerCallbackQuerySetters, SendMessageSetters},
        prelude::*,
        types::{
            CallbackQuery, ChatJoinRequest, InlineKeyboardButton, InlineKeyboardMarkup,
            MaybeInaccessibleMessage, MediaKind, MessageId, MessageKind, ParseMode, User,
        },
    },
    tracing::{debug, info, warn},
};

use crate::{error::Result, state::SharedState, verify::verify_subscriptions};

/// Callback action carried by the "verify subscription" buttons.
pub const CB_CHECK_SUBSCRIPTION: &str = "check_subscription";
/// Callback action carried by the "show links" buttons.
pub const CB_SHOW_LINKS: &str = "show_links";

/// Handle a single inbound message (called from the polling loop).
///
/// Group and supergroup traffic goes through the moderation gate; private
/// chats carry the command surface and the admin console. Channel posts and
/// anything else are ignored.
pub async fn handle_message(msg: Message, state: &SharedState) -> Result<()> {
    if msg.chat.is_group() || msg.chat.is_supergroup() {
        moderate_group_message(&msg, state).await
    } else if msg.chat.is_private() {
        handle_private_message(&msg, state).await
    } else {
        Ok(())
    }
}

/// Moderation gate: verify the sender of every group message against the
/// required channels and remove the message when the check fails.
///
/// Applies uniformly, the admin included. Delete and warning are
/// best-effort; a failure propagates to the polling loop's per-update log.
async fn moderate_group_message(msg: &Message, state: &SharedState) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        // Service messages and anonymous senders carry no user to verify.
        return Ok(());
    };

    let required = state.channels.snapshot();
    let verified = verify_subscriptions(
        &state.bot,
        &required,
        state.config.probe_error_policy,
        user.id,
    )
    .await;
    if verified {
        return Ok(());
    }

    info!(
        chat_id = msg.chat.id.0,
        user = user.id.0,
        "removing message from unverified sender"
    );
    state.bot.delete_message(msg.chat.id, msg.id).await?;
    state
        .bot
        .send_message(
            msg.chat.id,
            format!(
                "❌ {}, subscribe to all required channels to post here!",
                mention(user)
            ),
        )
        .parse_mode(ParseMode::Html)
        .reply_markup(warning_keyboard())
        .await?;
    Ok(())
}

/// Approve a pending join request and send the onboarding instructions.
///
/// Admission is unconditional; the gating policy is enforced afterwards by
/// the moderation gate on the member's first message, because the platform
/// has no conditional-admit primitive.
pub async fn handle_join_request(req: ChatJoinRequest, state: &SharedState) -> Result<()> {
    state
        .bot
        .approve_chat_join_request(req.chat.id, req.from.id)
        .await?;
    info!(
        chat_id = req.chat.id.0,
        user = req.from.id.0,
        "approved join request"
    );

    state
        .bot
        .send_message(req.user_chat_id, "Welcome! To get access to the chat:")
        .reply_markup(onboarding_keyboard(&state.channels.snapshot()))
        .await?;
    Ok(())
}

/// Handle an inline keyboard button press.
pub async fn handle_callback_query(query: CallbackQuery, state: &SharedState) -> Result<()> {
    match query.data.as_deref() {
        Some(CB_SHOW_LINKS) => show_links(&query, state).await,
        Some(CB_CHECK_SUBSCRIPTION) => check_subscription(&query, state).await,
        _ => {
            // Unknown action: answer to dismiss the client's loading spinner.
            state.bot.answer_callback_query(&query.id).await?;
            Ok(())
        },
    }
}

/// Render the link store as a self-deleting message of URL buttons.
async fn show_links(query: &CallbackQuery, state: &SharedState) -> Result<()> {
    let links = state.links.snapshot();
    if links.is_empty() {
        state
            .bot
            .answer_callback_query(&query.id)
            .text("No links yet!")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let Some(chat_id) = query.message.as_ref().map(|m| m.chat().id) else {
        // Button on a message too old for the API to resolve; just dismiss.
        state.bot.answer_callback_query(&query.id).await?;
        return Ok(());
    };

    let sent = state
        .bot
        .send_message(chat_id, "🔗 Current links:")
        .reply_markup(links_keyboard(&links))
        .await?;
    schedule_deletion(state.bot.clone(), chat_id, sent.id, state.config.links_ttl);

    state.bot.answer_callback_query(&query.id).await?;
    Ok(())
}

/// Re-run verification for the user pressing the button.
///
/// On success the message that carried the button (group warning or
/// onboarding DM) has served its purpose and is removed.
async fn check_subscription(query: &CallbackQuery, state: &SharedState) -> Result<()> {
    let required = state.channels.snapshot();
    let verified = verify_subscriptions(
        &state.bot,
        &required,
        state.config.probe_error_policy,
        query.from.id,
    )
    .await;

    if verified {
        state
            .bot
            .answer_callback_query(&query.id)
            .text("Access granted ✅")
            .await?;
        if let Some(MaybeInaccessibleMessage::Regular(m)) = &query.message {
            state.bot.delete_message(m.chat.id, m.id).await?;
        }
    } else {
        state
            .bot
            .answer_callback_query(&query.id)
            .text("Subscribe to all required channels! ❌")
            .show_alert(true)
            .await?;
    }
    Ok(())
}

/// Private-chat surface: public `/start`, the restricted admin commands, and
/// the admin link upsert. Non-admin calls to restricted surfaces are
/// silently ignored so their existence doesn't leak.
async fn handle_private_message(msg: &Message, state: &SharedState) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = extract_text(msg) else {
        return Ok(());
    };

    if let Some(rest) = text.strip_prefix('/') {
        let mut parts = rest.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        return match cmd {
            "start" => cmd_start(msg, state).await,
            "links" => cmd_links(msg, user, state).await,
            "add_channel" => cmd_add_channel(msg, user, parts.next(), state).await,
            _ => Ok(()),
        };
    }

    if user.id != state.config.admin_id {
        return Ok(());
    }
    match AdminInput::parse(&text) {
        Some(AdminInput::UpsertLink { name, url }) => {
            let reply = match state.links.upsert(&name, &url) {
                Ok(()) => {
                    info!(name = %name, "link saved");
                    "Link saved! ✅".to_string()
                },
                Err(e) => format!("Error: {e}"),
            };
            state.bot.send_message(msg.chat.id, reply).await?;
            Ok(())
        },
        None => Ok(()),
    }
}

/// Public main menu.
async fn cmd_start(msg: &Message, state: &SharedState) -> Result<()> {
    state
        .bot
        .send_message(msg.chat.id, "👋 I'm the gatekeeper bot. Pick an action:")
        .reply_markup(main_menu_keyboard(&state.config.admin_username))
        .await?;
    Ok(())
}

/// Admin-only: plain-text listing of every stored link.
async fn cmd_links(msg: &Message, user: &User, state: &SharedState) -> Result<()> {
    if user.id != state.config.admin_id {
        return Ok(());
    }

    let links = state.links.snapshot();
    let text = if links.is_empty() {
        "No links stored.".to_string()
    } else {
        let lines: Vec<String> = links
            .iter()
            .map(|(name, url)| format!("{name}: {url}"))
            .collect();
        format!("Stored links:\n{}", lines.join("\n"))
    };
    state.bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Admin-only: append a channel requirement. A duplicate identifier is a
/// silent no-op, as is the bare command without an argument.
async fn cmd_add_channel(
    msg: &Message,
    user: &User,
    channel: Option<&str>,
    state: &SharedState,
) -> Result<()> {
    if user.id != state.config.admin_id {
        return Ok(());
    }
    let Some(channel) = channel else {
        return Ok(());
    };

    if state.channels.add(channel)? {
        info!(channel, "channel requirement added");
        state
            .bot
            .send_message(msg.chat.id, format!("Channel {channel} added"))
            .await?;
    }
    Ok(())
}

/// Typed private-message input from the admin.
///
/// The platform offers no dedicated command for link management, so any
/// plain admin message containing `" - "` is read as an upsert. Parsing
/// into a variant keeps the match in one explicit place.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AdminInput {
    UpsertLink { name: String, url: String },
}

impl AdminInput {
    /// Split on the first `" - "`, trimming both sides. Text without the
    /// separator is not admin input at all.
    fn parse(text: &str) -> Option<Self> {
        let (name, url) = text.split_once(" - ")?;
        Some(Self::UpsertLink {
            name: name.trim().to_string(),
            url: url.trim().to_string(),
        })
    }
}

/// Delete a message after `ttl`.
///
/// The spawned task owns only the API client and the message handle; there
/// is no cancellation path, the deletion always fires.
fn schedule_deletion(bot: Bot, chat_id: ChatId, message: MessageId, ttl: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Err(e) = bot.delete_message(chat_id, message).await {
            debug!(chat_id = chat_id.0, error = %e, "ephemeral links message already gone");
        }
    });
}

// ── Keyboards ───────────────────────────────────────────────────────────────

fn warning_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "✅ Verify subscription",
            CB_CHECK_SUBSCRIPTION,
        )],
        vec![InlineKeyboardButton::callback(
            "🔗 Current links",
            CB_SHOW_LINKS,
        )],
    ])
}

/// One URL button per required channel, labeled positionally, followed by
/// the two fixed actions.
fn onboarding_keyboard(channels: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for (i, channel) in channels.iter().enumerate() {
        match reqwest::Url::parse(&channel_url(channel)) {
            Ok(url) => rows.push(vec![InlineKeyboardButton::url(
                format!("Channel {}", i + 1),
                url,
            )]),
            Err(e) => warn!(channel = %channel, error = %e, "cannot render channel button"),
        }
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "✅ Verify subscription",
        CB_CHECK_SUBSCRIPTION,
    )]);
    rows.push(vec![InlineKeyboardButton::callback(
        "🔗 Links",
        CB_SHOW_LINKS,
    )]);
    InlineKeyboardMarkup::new(rows)
}

fn main_menu_keyboard(admin_username: &str) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        "🔗 Current links",
        CB_SHOW_LINKS,
    )]];
    if !admin_username.is_empty()
        && let Ok(url) = reqwest::Url::parse(&format!("https://t.me/{admin_username}"))
    {
        rows.push(vec![InlineKeyboardButton::url("Contact admin", url)]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// One URL button per stored link, label = name.
fn links_keyboard(links: &BTreeMap<String, String>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for (name, url) in links {
        match reqwest::Url::parse(url) {
            Ok(url) => rows.push(vec![InlineKeyboardButton::url(name.clone(), url)]),
            Err(e) => {
                warn!(name = %name, error = %e, "stored link is not a valid URL, skipping button");
            },
        }
    }
    InlineKeyboardMarkup::new(rows)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// HTML mention linking by ID, so it works for users without a username.
fn mention(user: &User) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id,
        teloxide::utils::html::escape(&user.first_name)
    )
}

/// Best-effort web link for a stored channel identifier.
///
/// Handles resolve through `t.me`; numeric IDs use the `t.me/c/` form with
/// the supergroup marker prefix stripped.
fn channel_url(channel: &str) -> String {
    if let Ok(id) = channel.parse::<i64>() {
        let internal = id.unsigned_abs().to_string();
        let internal = internal.strip_prefix("100").unwrap_or(&internal);
        format!("https://t.me/c/{internal}")
    } else {
        let handle = channel.strip_prefix('@').unwrap_or(channel);
        format!("https://t.me/{handle}")
    }
}

/// Extract the plain text of a message, if any.
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use {
        axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
        secrecy::Secret,
        serde_json::{Value, json},
        teloxide::types::{InlineKeyboardButtonKind, UserId},
    };

    use {
        gatehouse_config::ProbeErrorPolicy,
        gatehouse_store::{ChannelRequirements, LinkStore},
    };

    use {
        super::*,
        crate::{config::BotConfig, state::BotState},
    };

    const ADMIN_ID: u64 = 500;
    const USER_ID: u64 = 1001;

    // ── Mock Bot API ────────────────────────────────────────────────────────

    #[derive(Clone)]
    struct MockTelegramApi {
        requests: Arc<Mutex<Vec<(String, Value)>>>,
        /// Status returned by every GetChatMember call.
        member_status: Arc<Mutex<String>>,
    }

    async fn telegram_api_handler(
        State(api): State<MockTelegramApi>,
        uri: Uri,
        body: Bytes,
    ) -> Json<Value> {
        let method = uri
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        api.requests
            .lock()
            .expect("lock requests")
            .push((method.clone(), body));

        let result = match method.as_str() {
            "SendMessage" => json!({
                "message_id": 99,
                "date": 1,
                "chat": {"id": 42, "type": "private"},
                "text": "ok"
            }),
            "GetChatMember" => json!({
                "status": api.member_status.lock().expect("lock status").clone(),
                "user": {"id": USER_ID, "is_bot": false, "first_name": "Alice"}
            }),
            _ => json!(true),
        };
        Json(json!({"ok": true, "result": result}))
    }

    struct Harness {
        state: SharedState,
        requests: Arc<Mutex<Vec<(String, Value)>>>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        async fn new(member_status: &str, channels: &[&str], links: &[(&str, &str)]) -> Self {
            Self::with_ttl(member_status, channels, links, Duration::from_millis(100)).await
        }

        async fn with_ttl(
            member_status: &str,
            channels: &[&str],
            links: &[(&str, &str)],
            links_ttl: Duration,
        ) -> Self {
            let requests = Arc::new(Mutex::new(Vec::new()));
            let api = MockTelegramApi {
                requests: Arc::clone(&requests),
                member_status: Arc::new(Mutex::new(member_status.to_string())),
            };
            let app = Router::new()
                .route("/{*path}", post(telegram_api_handler))
                .with_state(api);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind test listener");
            let addr = listener.local_addr().expect("local addr");
            tokio::spawn(async move {
                axum::serve(listener, app).await.expect("serve mock api");
            });
            tokio::time::sleep(Duration::from_millis(50)).await;

            let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
            let bot = Bot::new("test-token").set_api_url(api_url);

            let dir = tempfile::tempdir().expect("tempdir");
            let link_store = LinkStore::open(dir.path().join("links.json"));
            for (name, url) in links {
                link_store.upsert(name, url).expect("seed link");
            }
            let requirements = ChannelRequirements::open(dir.path().join("channels.json"));
            for channel in channels {
                requirements.add(channel).expect("seed channel");
            }

            let state = Arc::new(BotState {
                bot,
                config: BotConfig {
                    token: Secret::new("test-token".into()),
                    admin_id: UserId(ADMIN_ID),
                    admin_username: "boss".into(),
                    links_ttl,
                    probe_error_policy: ProbeErrorPolicy::Pass,
                },
                links: Arc::new(link_store),
                channels: Arc::new(requirements),
            });

            Self {
                state,
                requests,
                _dir: dir,
            }
        }

        fn calls(&self, method: &str) -> Vec<Value> {
            self.requests
                .lock()
                .expect("lock requests")
                .iter()
                .filter(|(m, _)| m == method)
                .map(|(_, body)| body.clone())
                .collect()
        }
    }

    fn group_message(text: &str, from_id: u64) -> Message {
        serde_json::from_value(json!({
            "message_id": 7,
            "date": 1,
            "chat": {"id": -100500, "type": "supergroup", "title": "Test"},
            "from": {"id": from_id, "is_bot": false, "first_name": "Alice", "username": "alice"},
            "text": text
        }))
        .expect("deserialize group message")
    }

    fn private_message(text: &str, from_id: u64) -> Message {
        serde_json::from_value(json!({
            "message_id": 8,
            "date": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Alice"},
            "from": {"id": from_id, "is_bot": false, "first_name": "Alice", "username": "alice"},
            "text": text
        }))
        .expect("deserialize private message")
    }

    fn callback(data: &str, from_id: u64) -> CallbackQuery {
        serde_json::from_value(json!({
            "id": "cbq1",
            "from": {"id": from_id, "is_bot": false, "first_name": "Alice", "username": "alice"},
            "chat_instance": "ci",
            "data": data,
            "message": {
                "message_id": 7,
                "date": 1,
                "chat": {"id": 42, "type": "private", "first_name": "Alice"},
                "text": "menu"
            }
        }))
        .expect("deserialize callback query")
    }

    fn join_request(from_id: u64) -> ChatJoinRequest {
        serde_json::from_value(json!({
            "chat": {"id": -100500, "type": "supergroup", "title": "Test"},
            "from": {"id": from_id, "is_bot": false, "first_name": "Alice", "username": "alice"},
            "user_chat_id": from_id,
            "date": 1
        }))
        .expect("deserialize join request")
    }

    fn keyboard_rows(body: &Value) -> &Vec<Value> {
        body["reply_markup"]["inline_keyboard"]
            .as_array()
            .expect("inline keyboard")
    }

    // ── Moderation gate ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn unverified_group_message_is_deleted_with_one_warning() {
        let h = Harness::new("left", &["@news"], &[]).await;
        handle_message(group_message("hello", USER_ID), &h.state)
            .await
            .expect("handle message");

        let deletes = h.calls("DeleteMessage");
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0]["chat_id"], json!(-100500));
        assert_eq!(deletes[0]["message_id"], json!(7));

        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1, "exactly one warning");
        let warning = &sends[0];
        assert_eq!(warning["chat_id"], json!(-100500));
        assert_eq!(warning["parse_mode"], json!("HTML"));
        let text = warning["text"].as_str().expect("warning text");
        assert!(text.contains(&format!("tg://user?id={USER_ID}")));

        let rows = keyboard_rows(warning);
        assert_eq!(rows.len(), 2, "two remediation actions");
        assert_eq!(rows[0][0]["callback_data"], json!(CB_CHECK_SUBSCRIPTION));
        assert_eq!(rows[1][0]["callback_data"], json!(CB_SHOW_LINKS));
    }

    #[tokio::test]
    async fn verified_group_message_stands() {
        let h = Harness::new("member", &["@news"], &[]).await;
        handle_message(group_message("hello", USER_ID), &h.state)
            .await
            .expect("handle message");

        assert_eq!(h.calls("GetChatMember").len(), 1);
        assert!(h.calls("DeleteMessage").is_empty());
        assert!(h.calls("SendMessage").is_empty());
    }

    #[tokio::test]
    async fn group_message_with_no_requirements_is_never_probed() {
        let h = Harness::new("left", &[], &[]).await;
        handle_message(group_message("hello", USER_ID), &h.state)
            .await
            .expect("handle message");

        assert!(h.calls("GetChatMember").is_empty());
        assert!(h.calls("DeleteMessage").is_empty());
    }

    // ── Join requests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn join_request_is_approved_then_onboarded() {
        let h = Harness::new("left", &["@a", "@b"], &[]).await;
        handle_join_request(join_request(USER_ID), &h.state)
            .await
            .expect("handle join request");

        let approvals = h.calls("ApproveChatJoinRequest");
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0]["chat_id"], json!(-100500));
        assert_eq!(approvals[0]["user_id"], json!(USER_ID));

        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1, "exactly one onboarding message");
        assert_eq!(sends[0]["chat_id"], json!(USER_ID));

        // One positional channel button per requirement, then the two fixed
        // actions.
        let rows = keyboard_rows(&sends[0]);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0]["text"], json!("Channel 1"));
        assert_eq!(rows[0][0]["url"], json!("https://t.me/a"));
        assert_eq!(rows[1][0]["text"], json!("Channel 2"));
        assert_eq!(rows[2][0]["callback_data"], json!(CB_CHECK_SUBSCRIPTION));
        assert_eq!(rows[3][0]["callback_data"], json!(CB_SHOW_LINKS));
    }

    // ── Link distribution ───────────────────────────────────────────────────

    #[tokio::test]
    async fn show_links_with_empty_store_answers_alert_only() {
        let h = Harness::new("member", &[], &[]).await;
        handle_callback_query(callback(CB_SHOW_LINKS, USER_ID), &h.state)
            .await
            .expect("handle callback");

        let answers = h.calls("AnswerCallbackQuery");
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0]["text"], json!("No links yet!"));
        assert_eq!(answers[0]["show_alert"], json!(true));
        assert!(h.calls("SendMessage").is_empty(), "no list message");
    }

    #[tokio::test]
    async fn show_links_sends_list_then_deletes_after_ttl() {
        let h = Harness::with_ttl(
            "member",
            &[],
            &[
                ("Alpha", "https://example.com/a"),
                ("Beta", "https://example.com/b"),
            ],
            Duration::from_millis(100),
        )
        .await;
        handle_callback_query(callback(CB_SHOW_LINKS, USER_ID), &h.state)
            .await
            .expect("handle callback");

        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1);
        let rows = keyboard_rows(&sends[0]);
        assert_eq!(rows.len(), 2, "one button per stored link");
        assert_eq!(rows[0][0]["text"], json!("Alpha"));
        assert_eq!(rows[0][0]["url"], json!("https://example.com/a"));

        // The callback is acknowledged and the list is still up.
        assert_eq!(h.calls("AnswerCallbackQuery").len(), 1);
        assert!(h.calls("DeleteMessage").is_empty(), "not deleted early");

        tokio::time::sleep(Duration::from_millis(300)).await;
        let deletes = h.calls("DeleteMessage");
        assert_eq!(deletes.len(), 1, "deleted after the delay");
        assert_eq!(deletes[0]["message_id"], json!(99));
    }

    // ── Subscription re-check ───────────────────────────────────────────────

    #[tokio::test]
    async fn check_subscription_pass_removes_the_prompt() {
        let h = Harness::new("member", &["@news"], &[]).await;
        handle_callback_query(callback(CB_CHECK_SUBSCRIPTION, USER_ID), &h.state)
            .await
            .expect("handle callback");

        let answers = h.calls("AnswerCallbackQuery");
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0]["text"], json!("Access granted ✅"));

        let deletes = h.calls("DeleteMessage");
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0]["message_id"], json!(7));
    }

    #[tokio::test]
    async fn check_subscription_fail_answers_with_alert() {
        let h = Harness::new("left", &["@news"], &[]).await;
        handle_callback_query(callback(CB_CHECK_SUBSCRIPTION, USER_ID), &h.state)
            .await
            .expect("handle callback");

        let answers = h.calls("AnswerCallbackQuery");
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0]["show_alert"], json!(true));
        assert!(h.calls("DeleteMessage").is_empty());
    }

    // ── Admin console ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn admin_upsert_saves_link_and_confirms() {
        let h = Harness::new("member", &[], &[]).await;
        handle_message(
            private_message("Alpha - https://example.com/a", ADMIN_ID),
            &h.state,
        )
        .await
        .expect("handle message");

        let links = h.state.links.snapshot();
        assert_eq!(links["Alpha"], "https://example.com/a");

        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0]["text"], json!("Link saved! ✅"));
    }

    #[tokio::test]
    async fn non_admin_upsert_is_silently_ignored() {
        let h = Harness::new("member", &[], &[]).await;
        handle_message(
            private_message("Alpha - https://example.com/a", USER_ID),
            &h.state,
        )
        .await
        .expect("handle message");

        assert!(h.state.links.is_empty());
        assert!(h.calls("SendMessage").is_empty());
    }

    #[tokio::test]
    async fn admin_message_without_separator_is_not_an_upsert() {
        let h = Harness::new("member", &[], &[]).await;
        handle_message(private_message("https://example.com/a", ADMIN_ID), &h.state)
            .await
            .expect("handle message");

        assert!(h.state.links.is_empty());
        assert!(h.calls("SendMessage").is_empty());
    }

    #[tokio::test]
    async fn links_command_lists_for_admin_only() {
        let h = Harness::new("member", &[], &[("Alpha", "https://example.com/a")]).await;

        handle_message(private_message("/links", USER_ID), &h.state)
            .await
            .expect("handle message");
        assert!(h.calls("SendMessage").is_empty(), "silent for non-admin");

        handle_message(private_message("/links", ADMIN_ID), &h.state)
            .await
            .expect("handle message");
        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1);
        let text = sends[0]["text"].as_str().expect("listing text");
        assert!(text.contains("Alpha: https://example.com/a"));
    }

    #[tokio::test]
    async fn add_channel_appends_once_and_confirms_once() {
        let h = Harness::new("member", &[], &[]).await;

        handle_message(private_message("/add_channel @news", ADMIN_ID), &h.state)
            .await
            .expect("handle message");
        handle_message(private_message("/add_channel @news", ADMIN_ID), &h.state)
            .await
            .expect("handle message");

        assert_eq!(h.state.channels.snapshot(), vec!["@news"]);
        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1, "duplicate add is silent");
        assert_eq!(sends[0]["text"], json!("Channel @news added"));
    }

    #[tokio::test]
    async fn add_channel_from_non_admin_is_silent() {
        let h = Harness::new("member", &[], &[]).await;
        handle_message(private_message("/add_channel @news", USER_ID), &h.state)
            .await
            .expect("handle message");

        assert!(h.state.channels.is_empty());
        assert!(h.calls("SendMessage").is_empty());
    }

    #[tokio::test]
    async fn start_shows_main_menu() {
        let h = Harness::new("member", &[], &[]).await;
        handle_message(private_message("/start", USER_ID), &h.state)
            .await
            .expect("handle message");

        let sends = h.calls("SendMessage");
        assert_eq!(sends.len(), 1);
        let rows = keyboard_rows(&sends[0]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["callback_data"], json!(CB_SHOW_LINKS));
        assert_eq!(rows[1][0]["url"], json!("https://t.me/boss"));
    }

    // ── Pure parsing ────────────────────────────────────────────────────────

    #[test]
    fn admin_input_parses_name_and_url() {
        assert_eq!(
            AdminInput::parse("Alpha - https://example.com/a"),
            Some(AdminInput::UpsertLink {
                name: "Alpha".into(),
                url: "https://example.com/a".into()
            })
        );
    }

    #[test]
    fn admin_input_splits_on_first_separator_only() {
        assert_eq!(
            AdminInput::parse("A - B - C"),
            Some(AdminInput::UpsertLink {
                name: "A".into(),
                url: "B - C".into()
            })
        );
    }

    #[test]
    fn admin_input_trims_both_sides() {
        assert_eq!(
            AdminInput::parse("  Alpha  -  https://example.com/a "),
            Some(AdminInput::UpsertLink {
                name: "Alpha".into(),
                url: "https://example.com/a".into()
            })
        );
    }

    #[test]
    fn admin_input_requires_separator() {
        assert_eq!(AdminInput::parse("https://example.com/a"), None);
        assert_eq!(AdminInput::parse("Alpha-https://example.com/a"), None);
    }

    #[test]
    fn channel_url_forms() {
        assert_eq!(channel_url("@news"), "https://t.me/news");
        assert_eq!(channel_url("news"), "https://t.me/news");
        assert_eq!(channel_url("-1001234567890"), "https://t.me/c/1234567890");
    }

    #[test]
    fn warning_keyboard_has_two_actions() {
        let kb = warning_keyboard();
        assert_eq!(kb.inline_keyboard.len(), 2);
        for row in &kb.inline_keyboard {
            assert!(matches!(
                row[0].kind,
                InlineKeyboardButtonKind::CallbackData(_)
            ));
        }
    }

    #[test]
    fn main_menu_without_admin_username_drops_contact_row() {
        let kb = main_menu_keyboard("");
        assert_eq!(kb.inline_keyboard.len(), 1);
    }
}
