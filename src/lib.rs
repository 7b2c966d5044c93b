//! Messenger webhook — routes batched callback events to per-kind handlers.

pub mod callback;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod webhook;

pub use callback::{Callback, Entry, MessagingEntry};
pub use dispatcher::{Dispatcher, DispatcherBuilder, HandlerSetter, MessageEntryHandler};
pub use event::{EventKind, MessagingEvent};
