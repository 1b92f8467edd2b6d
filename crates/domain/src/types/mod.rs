//! Domain types exchanged between the client core and its collaborators

pub mod auth;
pub mod session;

pub use auth::{AuthResponse, Credentials, RefreshRequest, RefreshResponse, SignupRequest};
pub use session::{Session, UserRecord};
