//! Macro for implementing Display and FromStr for status enums
//!
//! Status enums are stored as their upper-case code in SQLite columns and
//! JSON, so both directions go through one mapping.
//!
//! # Example
//!
//! ```rust
//! use pocket_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum TicketState {
//!     Open,
//!     Closed,
//! }
//!
//! impl_domain_status_conversions!(TicketState {
//!     Open => "OPEN",
//!     Closed => "CLOSED",
//! });
//!
//! assert_eq!(TicketState::Open.to_string(), "OPEN");
//! assert_eq!("closed".parse::<TicketState>().unwrap(), TicketState::Closed);
//! ```

/// Implements Display and FromStr for status enums
///
/// - Display writes the mapped code verbatim
/// - FromStr matches the code case-insensitively and names the enum in the
///   error message
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable storage code
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
