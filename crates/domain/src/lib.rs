//! # LessonHub Domain
//!
//! Plain data shared by every layer of the LessonHub API client.
//!
//! This crate contains:
//! - The error taxonomy (`ApiError`, `ErrorKind`) and the status classifier
//! - Session, user and credential types exchanged with the backend
//! - Configuration structures
//! - Storage keys and default endpoint constants
//!
//! ## Architecture
//! - No dependencies on other LessonHub crates
//! - Only external dependencies allowed
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
