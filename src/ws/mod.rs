pub mod broadcaster;
pub mod registry;
pub mod room;

pub use broadcaster::{RoomChannel, RoomEvent, Subscription};
pub use registry::{JoinedRoom, SessionRegistry};
pub use room::Room;
