//! Slack incoming-webhook notifications for lifecycle events.

use crate::hook::{HookSet, LifecycleHook};
use async_trait::async_trait;
use bifrost_types::{Bundle, LifecycleEvent};
use serde_json::{json, Value};
use std::sync::Arc;

/// A Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self::with_client(webhook_url, reqwest::Client::new())
    }

    pub fn with_client(webhook_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client,
        }
    }

    /// Post a message. Non-2xx responses are errors so callers can retry.
    pub async fn send(&self, message: &SlackMessage) -> anyhow::Result<()> {
        self.client
            .post(&self.webhook_url)
            .json(&message.build())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// One table cell; `bold` maps to the rich-text style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    pub bold: bool,
}

impl TableCell {
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }
}

/// Block Kit message builder.
#[derive(Debug, Clone, Default)]
pub struct SlackMessage {
    text: String,
    blocks: Vec<Value>,
}

impl SlackMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback text shown in notifications.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn custom(mut self, block: Value) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn divider(self) -> Self {
        self.custom(json!({ "type": "divider" }))
    }

    pub fn mrkdwn(self, text: impl Into<String>) -> Self {
        self.custom(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": text.into() },
        }))
    }

    pub fn table(self, rows: Vec<Vec<TableCell>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(rich_text_cell).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        self.custom(json!({ "type": "table", "rows": rows }))
    }

    pub fn build(&self) -> Value {
        json!({ "text": self.text, "blocks": self.blocks })
    }
}

fn rich_text_cell(cell: TableCell) -> Value {
    json!({
        "type": "rich_text",
        "elements": [{
            "type": "rich_text_section",
            "elements": [{
                "type": "text",
                "text": cell.text,
                "style": { "bold": cell.bold },
            }],
        }],
    })
}

/// Posts a formatted notification for one lifecycle event.
pub struct SlackHook {
    channel: Arc<SlackChannel>,
    event: LifecycleEvent,
}

impl SlackHook {
    pub fn new(channel: Arc<SlackChannel>, event: LifecycleEvent) -> Self {
        Self { channel, event }
    }

    pub fn message(&self, bundle: &Bundle, environment: &str) -> SlackMessage {
        let tag = normalize_tag(&bundle.tag);
        let (emoji, title, action) = match self.event {
            LifecycleEvent::Reserve => (
                ":information_source:",
                "Bundle Reserved",
                format!("has reserved a new bundle for the *{tag}* tag"),
            ),
            LifecycleEvent::Push => (
                ":warning:",
                "New Bundle Pushed",
                format!("has pushed a new bundle to the *{tag}* tag"),
            ),
            LifecycleEvent::Dispose => (
                ":wastebasket:",
                "Bundle Disposed",
                format!("has disposed a bundle for the *{tag}* tag"),
            ),
            LifecycleEvent::Rollback => (
                ":leftwards_arrow_with_hook:",
                "Bundle Rolled Back",
                format!("has rolled back the latest bundle of the *{tag}* tag"),
            ),
        };

        SlackMessage::new()
            .text(format!("{title}: {}", bundle.id))
            .mrkdwn(format!(
                "{emoji} *{title}*\n*{}* {action} in the *{environment}* environment.",
                display_author(bundle)
            ))
            .divider()
            .table(bundle_table(bundle))
    }
}

#[async_trait]
impl LifecycleHook for SlackHook {
    async fn call(&self, bundle: &Bundle, environment: &str) -> anyhow::Result<()> {
        self.channel.send(&self.message(bundle, environment)).await
    }
}

/// Default Slack notifications for every lifecycle event.
pub fn slack_hooks(channel: SlackChannel) -> HookSet {
    let channel = Arc::new(channel);
    LifecycleEvent::ALL
        .into_iter()
        .fold(HookSet::new(), |hooks, event| {
            hooks.with(event, Arc::new(SlackHook::new(channel.clone(), event)))
        })
}

fn display_author(bundle: &Bundle) -> &str {
    if bundle.author.is_empty() {
        "Unknown"
    } else {
        &bundle.author
    }
}

fn bundle_table(bundle: &Bundle) -> Vec<Vec<TableCell>> {
    let note = if bundle.note.is_empty() {
        "N/A"
    } else {
        bundle.note.as_str()
    };
    let row = |label: &str, value: &str| vec![TableCell::bold(label), TableCell::plain(value)];

    vec![
        vec![TableCell::bold("Property"), TableCell::bold("Value")],
        row("Bundle ID", bundle.id.as_str()),
        row("Version", &bundle.version),
        row("Tag", &normalize_tag(&bundle.tag)),
        row("Author", display_author(bundle)),
        row(
            "Created At",
            &bundle.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        row("Notes", note),
    ]
}

/// `heimdall-client` → `Heimdall Client`
pub fn normalize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut at_word_start = true;
    for c in tag.chars() {
        let c = if c == '-' { ' ' } else { c };
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !is_word;
    }
    out
}
