//! WebRTC signaling: typed messages, the membership policy seam, and the
//! relay that routes call-setup messages between co-members of a room.

pub mod messages;
pub mod policy;
pub mod relay;

pub use messages::{MediaStateResponse, MediaType, SignalKind, SignalRequest, SignalResponse};
pub use policy::{PresencePolicy, SignalPolicy};
pub use relay::{Caller, SignalRelay};
