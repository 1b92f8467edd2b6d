//! # LessonHub App
//!
//! Composition root: builds the token store, session state, refresh
//! coordinator, API client and session façade from a
//! `lessonhub_domain::ClientConfig`, plus the `lessonhub` binary.
//!
//! ## Architecture
//! - Depends on `domain`, `common`, `core`, and `infra`
//! - Owns no behavior of its own beyond wiring

pub mod context;

pub use context::AppContext;
