//! WebSocket transport: wire framing, outbound fanout, and the
//! per-connection event loop.

pub mod events;
pub mod fanout;
pub mod server;
