//! Transport layer shared by the API client and the refresh exchange

pub mod client;

pub use client::{HttpClient, RetryPolicy};
