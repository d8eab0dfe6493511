pub mod handler;
pub mod msg_changes_handler;
pub mod msg_join_handler;
pub mod msg_presence_handler;

pub use handler::websocket_handler;
