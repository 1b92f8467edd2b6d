//! Header value hygiene

/// Remove CR and LF so a value can never split into a second header line
pub fn sanitize_header_value(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}
