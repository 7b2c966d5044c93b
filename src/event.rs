//! Classification of a messaging entry into a single event kind.
//!
//! The platform never sends an explicit type tag; the kind is inferred from
//! which payload field is populated. Fields are checked in a fixed order
//! (message, delivery, postback, opt-in, referral) and the first one present
//! decides. An entry with none of them is `Unknown` and gets skipped by the
//! dispatcher, so new event kinds added upstream do not break dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::callback::{Delivery, Message, MessagingEntry, OptIn, Postback, Referral};
use crate::error::ClassifyError;

/// The five routable event kinds, in classification precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Delivery,
    Postback,
    /// Opt-in from a Messenger plugin.
    Authentication,
    Referral,
}

impl EventKind {
    /// All kinds, in precedence order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Message,
        EventKind::Delivery,
        EventKind::Postback,
        EventKind::Authentication,
        EventKind::Referral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Delivery => "delivery",
            EventKind::Postback => "postback",
            EventKind::Authentication => "authentication",
            EventKind::Referral => "referral",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed, tagged view of a messaging entry's payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessagingEvent<'a> {
    Message(&'a Message),
    Delivery(&'a Delivery),
    Postback(&'a Postback),
    Authentication(&'a OptIn),
    Referral(&'a Referral),
    Unknown,
}

impl MessagingEvent<'_> {
    /// `None` for `Unknown`.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            MessagingEvent::Message(_) => Some(EventKind::Message),
            MessagingEvent::Delivery(_) => Some(EventKind::Delivery),
            MessagingEvent::Postback(_) => Some(EventKind::Postback),
            MessagingEvent::Authentication(_) => Some(EventKind::Authentication),
            MessagingEvent::Referral(_) => Some(EventKind::Referral),
            MessagingEvent::Unknown => None,
        }
    }
}

impl MessagingEntry {
    /// Classify by presence, first match wins.
    ///
    /// An entry carrying both a message and a postback is a message; the
    /// postback is ignored.
    pub fn event(&self) -> MessagingEvent<'_> {
        if let Some(message) = &self.message {
            MessagingEvent::Message(message)
        } else if let Some(delivery) = &self.delivery {
            MessagingEvent::Delivery(delivery)
        } else if let Some(postback) = &self.postback {
            MessagingEvent::Postback(postback)
        } else if let Some(opt_in) = &self.opt_in {
            MessagingEvent::Authentication(opt_in)
        } else if let Some(referral) = &self.referral {
            MessagingEvent::Referral(referral)
        } else {
            MessagingEvent::Unknown
        }
    }

    /// Kind of this entry, or `None` when no known payload is populated.
    pub fn kind(&self) -> Option<EventKind> {
        self.event().kind()
    }

    /// Every populated payload kind, in precedence order.
    pub fn populated_kinds(&self) -> Vec<EventKind> {
        let present = [
            self.message.is_some(),
            self.delivery.is_some(),
            self.postback.is_some(),
            self.opt_in.is_some(),
            self.referral.is_some(),
        ];
        EventKind::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(kind, set)| set.then_some(kind))
            .collect()
    }

    /// Like [`event`](Self::event), but rejects entries with more than one
    /// payload. An entry with no payload is still `Unknown`, not an error.
    pub fn strict_event(&self) -> Result<MessagingEvent<'_>, ClassifyError> {
        let kinds = self.populated_kinds();
        if kinds.len() > 1 {
            return Err(ClassifyError::Ambiguous { kinds });
        }
        Ok(self.event())
    }
}
