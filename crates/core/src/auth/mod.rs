//! Authentication state and refresh coordination

pub mod ports;
pub mod refresh;
pub mod session_state;

#[cfg(test)]
pub(crate) mod test_support;
