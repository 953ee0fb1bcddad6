//! Wire types exchanged with the chat-messages endpoint.

pub mod reply;
pub mod request;

pub use reply::*;
pub use request::*;
