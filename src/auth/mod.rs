pub mod authenticator;

pub use authenticator::{Authenticator, JwtAuthenticator};
