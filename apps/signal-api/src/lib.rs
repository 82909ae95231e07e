pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod session;
pub mod signaling;
pub mod store;

use std::sync::Arc;

use config::Config;
use gateway::fanout::SignalFanout;
use session::{
    ConnectionLifecycle, DisconnectEvents, RoomCleanup, RoomPresence, SessionRegistry,
};
use signaling::{PresencePolicy, SignalPolicy, SignalRelay};
use store::{SessionData, SessionStore};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: SessionRegistry,
    pub presence: RoomPresence,
    pub lifecycle: ConnectionLifecycle,
    pub relay: SignalRelay,
    pub fanout: SignalFanout,
    pub disconnects: DisconnectEvents,
}

impl AppState {
    /// Wire up all services over the given session store.
    pub fn new(config: Config, store: Arc<dyn SessionStore>) -> Self {
        let data = SessionData::new(store);
        let fanout = SignalFanout::new();

        let registry = SessionRegistry::new(data.clone());
        let presence = RoomPresence::new(data, fanout.clone());

        // Disconnect teardown: room cleanup listens for session-ended events.
        let disconnects = DisconnectEvents::new();
        disconnects.subscribe(Arc::new(RoomCleanup::new(presence.clone())));

        let lifecycle = ConnectionLifecycle::new(registry.clone(), disconnects.clone());

        let policy: Arc<dyn SignalPolicy> = Arc::new(PresencePolicy::new(presence.clone()));
        let relay = SignalRelay::new(registry.clone(), policy, fanout.clone());

        Self {
            config: Arc::new(config),
            registry,
            presence,
            lifecycle,
            relay,
            fanout,
            disconnects,
        }
    }
}
