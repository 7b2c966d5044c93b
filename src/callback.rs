//! Webhook payload model — the `Callback` a Messenger page subscription
//! delivers, already split into entries and messaging entries.
//!
//! Every kind-specific payload on [`MessagingEntry`] is optional. The
//! platform populates exactly one per interaction, but nothing here
//! enforces it; see [`crate::event`] for how an entry is classified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `object` value sent for page subscriptions.
pub const PAGE_OBJECT: &str = "page";

/// Top-level webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    /// Subscription object type ("page" for Messenger).
    #[serde(default)]
    pub object: String,
    /// Entries in delivery order.
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

impl Callback {
    /// Decode a callback from a raw JSON body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Whether this callback belongs to a page subscription.
    pub fn is_page(&self) -> bool {
        self.object == PAGE_OBJECT
    }

    /// All messaging entries across every entry, in traversal order.
    pub fn messaging_entries(&self) -> impl Iterator<Item = &MessagingEntry> {
        self.entries.iter().flat_map(|entry| entry.messaging.iter())
    }
}

/// One notification unit within a callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Page ID.
    #[serde(default)]
    pub id: String,
    /// Time of the update, epoch milliseconds.
    #[serde(default)]
    pub time: i64,
    /// Batched interactions, in order.
    #[serde(default)]
    pub messaging: Vec<MessagingEntry>,
}

/// A single user interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagingEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Principal>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback: Option<Postback>,
    #[serde(rename = "optin", default, skip_serializing_if = "Option::is_none")]
    pub opt_in: Option<OptIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<Referral>,
}

impl MessagingEntry {
    /// Interaction time as a UTC timestamp, if present and in range.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }

    /// Page-scoped ID of the sender, if any.
    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().map(|s| s.id.as_str())
    }
}

/// Sender or recipient of an interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub id: String,
    /// Set instead of `id` for checkbox-plugin opt-ins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ref: Option<String>,
}

/// An inbound (or echoed) message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub mid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReply>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Message was sent by the page itself.
    #[serde(default)]
    pub is_echo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickReply {
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// "image", "audio", "video", "file", "location", "fallback", ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Delivery receipt for messages the page sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(default)]
    pub mids: Vec<String>,
    /// All messages sent before this time (epoch ms) were delivered.
    #[serde(default)]
    pub watermark: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
}

/// Button or persistent-menu tap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Postback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: String,
    /// Present when the postback came through an m.me link or ad.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<Referral>,
}

/// Authentication event from the Send-to-Messenger or checkbox plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptIn {
    /// Data-ref passed by the plugin.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ref: Option<String>,
}

/// Referral from an m.me link, ad, or customer-chat plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// "SHORTLINK", "ADS", "MESSENGER_CODE", ...
    #[serde(default)]
    pub source: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
}
