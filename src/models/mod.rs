pub mod doc_latest;
pub mod doc_save;
pub mod doc_version;
pub mod error;
pub mod health;
pub mod identity;
pub mod messages;
pub mod version;

pub use doc_latest::*;
pub use doc_save::*;
pub use doc_version::*;
pub use error::*;
pub use health::*;
pub use identity::*;
pub use messages::*;
pub use version::*;
