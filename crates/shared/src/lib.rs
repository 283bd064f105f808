//! Wire protocol shared by the game server and its clients.
//!
//! Everything here is plain serde data: HTTP request/response bodies and the
//! tagged messages exchanged over the `/ws/board/{id}` duplex channel.

pub mod protocol;

pub use protocol::*;
