//! Session lifecycle: who is connected, and in which room.

pub mod info;
pub mod lifecycle;
pub mod presence;
pub mod registry;

pub use info::SessionInfo;
pub use lifecycle::{ConnectionLifecycle, DisconnectEvents, DisconnectListener, SessionDisconnected};
pub use presence::{RoomCleanup, RoomPresence};
pub use registry::SessionRegistry;
