//! Callback dispatcher — routes each messaging entry of a webhook delivery
//! to the handler registered for its event kind.
//!
//! A dispatcher holds exactly one handler per [`EventKind`]. Slots that are
//! never set fall back to a handler that succeeds without doing anything,
//! so callers only wire up the kinds they care about. Handlers are fixed at
//! construction; the dispatcher itself holds no mutable state and can be
//! shared across tasks behind an `Arc`.
//!
//! Because the platform batches interactions, one `dispatch` call may invoke
//! the same handler several times.

use std::fmt;
use std::sync::Arc;

use crate::callback::{Callback, MessagingEntry};
use crate::error::DispatchError;
use crate::event::EventKind;

/// Handles a single interaction with a user.
pub type MessageEntryHandler<E> = Arc<dyn Fn(&MessagingEntry) -> Result<(), E> + Send + Sync>;

fn noop<E>(_: &MessagingEntry) -> Result<(), E> {
    Ok(())
}

fn noop_handler<E: 'static>() -> MessageEntryHandler<E> {
    Arc::new(noop::<E>)
}

// ── Handler setters ─────────────────────────────────────────────────────

/// Assigns one handler slot. Applied in order by [`Dispatcher::new`].
pub struct HandlerSetter<E> {
    kind: EventKind,
    handler: MessageEntryHandler<E>,
}

impl<E> HandlerSetter<E> {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl<E> fmt::Debug for HandlerSetter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSetter")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Set the handler for `kind`.
pub fn set_handler<E, F>(kind: EventKind, handler: F) -> HandlerSetter<E>
where
    F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
{
    HandlerSetter {
        kind,
        handler: Arc::new(handler),
    }
}

pub fn message_handler<E, F>(handler: F) -> HandlerSetter<E>
where
    F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
{
    set_handler(EventKind::Message, handler)
}

pub fn delivery_handler<E, F>(handler: F) -> HandlerSetter<E>
where
    F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
{
    set_handler(EventKind::Delivery, handler)
}

pub fn postback_handler<E, F>(handler: F) -> HandlerSetter<E>
where
    F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
{
    set_handler(EventKind::Postback, handler)
}

/// Handler for opt-in events.
pub fn authentication_handler<E, F>(handler: F) -> HandlerSetter<E>
where
    F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
{
    set_handler(EventKind::Authentication, handler)
}

pub fn referral_handler<E, F>(handler: F) -> HandlerSetter<E>
where
    F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
{
    set_handler(EventKind::Referral, handler)
}

// ── Dispatcher ──────────────────────────────────────────────────────────

/// Routes messaging entries to per-kind handlers.
pub struct Dispatcher<E> {
    message: MessageEntryHandler<E>,
    delivery: MessageEntryHandler<E>,
    postback: MessageEntryHandler<E>,
    authentication: MessageEntryHandler<E>,
    referral: MessageEntryHandler<E>,
}

impl<E: 'static> Dispatcher<E> {
    /// Build a dispatcher with every slot defaulted to a no-op, then apply
    /// `setters` in order. A later setter for the same kind replaces an
    /// earlier one.
    pub fn new<I>(setters: I) -> Self
    where
        I: IntoIterator<Item = HandlerSetter<E>>,
    {
        let mut dispatcher = Self {
            message: noop_handler(),
            delivery: noop_handler(),
            postback: noop_handler(),
            authentication: noop_handler(),
            referral: noop_handler(),
        };
        for setter in setters {
            *dispatcher.slot_mut(setter.kind) = setter.handler;
        }
        dispatcher
    }

    /// Start a chained builder.
    pub fn builder() -> DispatcherBuilder<E> {
        DispatcherBuilder::new()
    }

    fn slot(&self, kind: EventKind) -> &MessageEntryHandler<E> {
        match kind {
            EventKind::Message => &self.message,
            EventKind::Delivery => &self.delivery,
            EventKind::Postback => &self.postback,
            EventKind::Authentication => &self.authentication,
            EventKind::Referral => &self.referral,
        }
    }

    fn slot_mut(&mut self, kind: EventKind) -> &mut MessageEntryHandler<E> {
        match kind {
            EventKind::Message => &mut self.message,
            EventKind::Delivery => &mut self.delivery,
            EventKind::Postback => &mut self.postback,
            EventKind::Authentication => &mut self.authentication,
            EventKind::Referral => &mut self.referral,
        }
    }

    /// Route every messaging entry in `callback` to its handler.
    ///
    /// Entries are visited strictly in input order. The first handler error
    /// stops the whole batch, including entries after the current one, and is
    /// returned unchanged. Entries with no recognised payload are skipped.
    pub fn dispatch(&self, callback: &Callback) -> Result<(), E> {
        tracing::debug!(entries = callback.entries.len(), "Dispatching callback");

        for (entry_index, entry) in callback.entries.iter().enumerate() {
            for (position, messaging) in entry.messaging.iter().enumerate() {
                let Some(kind) = messaging.kind() else {
                    tracing::trace!(
                        entry = entry_index,
                        position,
                        "Skipping messaging entry with no known payload"
                    );
                    continue;
                };

                if let Err(err) = (self.slot(kind))(messaging) {
                    tracing::debug!(
                        entry = entry_index,
                        position,
                        kind = %kind,
                        "Handler failed; aborting dispatch"
                    );
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Strict variant of [`dispatch`](Self::dispatch).
    ///
    /// Every messaging entry is classified up front; if any carries more than
    /// one payload, no handler runs and the offending position is reported.
    /// Entries with no payload are still skipped.
    pub fn dispatch_strict(&self, callback: &Callback) -> Result<(), DispatchError<E>> {
        for (entry, item) in callback.entries.iter().enumerate() {
            for (position, messaging) in item.messaging.iter().enumerate() {
                messaging
                    .strict_event()
                    .map_err(|source| DispatchError::Classify {
                        entry,
                        position,
                        source,
                    })?;
            }
        }

        self.dispatch(callback).map_err(DispatchError::Handler)
    }
}

impl<E: 'static> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl<E> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────

/// Chained alternative to passing setters to [`Dispatcher::new`].
pub struct DispatcherBuilder<E> {
    setters: Vec<HandlerSetter<E>>,
}

impl<E: 'static> DispatcherBuilder<E> {
    pub fn new() -> Self {
        Self {
            setters: Vec::new(),
        }
    }

    pub fn handler<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
    {
        self.setters.push(set_handler(kind, handler));
        self
    }

    pub fn on_message<F>(self, handler: F) -> Self
    where
        F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
    {
        self.handler(EventKind::Message, handler)
    }

    pub fn on_delivery<F>(self, handler: F) -> Self
    where
        F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
    {
        self.handler(EventKind::Delivery, handler)
    }

    pub fn on_postback<F>(self, handler: F) -> Self
    where
        F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
    {
        self.handler(EventKind::Postback, handler)
    }

    pub fn on_authentication<F>(self, handler: F) -> Self
    where
        F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
    {
        self.handler(EventKind::Authentication, handler)
    }

    pub fn on_referral<F>(self, handler: F) -> Self
    where
        F: Fn(&MessagingEntry) -> Result<(), E> + Send + Sync + 'static,
    {
        self.handler(EventKind::Referral, handler)
    }

    pub fn build(self) -> Dispatcher<E> {
        Dispatcher::new(self.setters)
    }
}

impl<E: 'static> Default for DispatcherBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
