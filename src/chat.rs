//! Chat capability: content types, client traits, and the Matrix backend.

pub mod content;
pub mod matrix;
#[cfg(test)]
pub mod testing;
pub mod traits;

pub use content::{ReactionContent, RelatesTo, RoomMessage, COMMENT_ID_FIELD};
pub use matrix::MatrixClient;
pub use traits::{ChatClient, ChatClientDyn, ChatEvent, ChatEventStream, MessageEvent, StateEvent};
