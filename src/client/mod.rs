//! Client side of the engine: the per-session synchronization agent, its
//! live connection and the REST-backed version store it saves through.

pub mod agent;
pub mod connection;
pub mod http_store;

pub use agent::{AgentEvent, AgentState, Navigation, SaveOutcome, SyncAgent};
pub use connection::LiveConnection;
pub use http_store::HttpVersionStore;
