//! Entity Module
//!
//! Typed records for the chat entity and its sub-resources. Version, TTL,
//! and domain invariants are enforced by these types rather than by
//! convention on loose maps.

mod chat;
mod draft;
mod message;
mod owner;

pub use chat::ChatRecord;
pub use draft::Draft;
pub use message::{Message, MessageRole};
pub use owner::OwnerId;
