//! Macro for implementing Display and FromStr for label enums
//!
//! Several domain enums travel as short lowercase labels (configuration
//! values, log fields). This macro provides both directions of that mapping
//! from a single table.
//!
//! # Example
//!
//! ```rust
//! use lessonhub_domain::impl_domain_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum SlotState {
//!     Free,
//!     Locked,
//!     Booked,
//! }
//!
//! impl_domain_label_conversions!(SlotState {
//!     Free => "free",
//!     Locked => "locked",
//!     Booked => "booked",
//! });
//!
//! assert_eq!(SlotState::Locked.to_string(), "locked");
//! assert_eq!("BOOKED".parse::<SlotState>(), Ok(SlotState::Booked));
//! ```

/// Implements Display and FromStr traits for label enums
///
/// - Display writes the label exactly as given in the table
/// - FromStr lowercases its input before matching, so labels in the table
///   must be lowercase
#[macro_export]
macro_rules! impl_domain_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
