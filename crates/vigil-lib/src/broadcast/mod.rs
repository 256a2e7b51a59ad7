//! Publish/subscribe broadcast of the composite dashboard state
//!
//! The [`BroadcastHub`] owns the connected-clients directory and the shared
//! output queue. The [`Broadcaster`] task pushes the composite state on a
//! fixed period; WebSocket sessions and the REST layer relay client
//! messages through the same queue.

pub mod directory;
pub mod hub;
pub mod validation;
pub mod wire;

pub use directory::{ClientDirectory, ClientEntry, Registration};
pub use hub::{encode, BroadcastHub, Broadcaster, Outbound, CHANNEL_CAPACITY, MESSAGE_HISTORY_CAP};
pub use validation::{
    sanitize, validate_registration, validate_text, DEFAULT_MAX_MESSAGE_LEN, MAX_CAPABILITIES,
    MAX_LABEL_LEN,
};
pub use wire::{
    parse_client_message, ChatMessage, ClientMessage, CompositeState, ErrorFrame,
    MessageSubmission, ServerMessage,
};
