//! Transport-agnostic HTTP helpers
//!
//! - **[`response`]**: success body parsing with array salvage
//! - **[`headers`]**: header value hygiene

pub mod headers;
pub mod response;

pub use headers::sanitize_header_value;
pub use response::{
    balanced_array_span, is_structured_content_type, BodyOutcome, ParsedBody, ResponseBody,
    ResponseParser,
};
