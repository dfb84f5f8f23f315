//! Macro for implementing Display and FromStr for keyword enums
//!
//! Harvest modes and similar keyword enums are logged, written to reports and
//! parsed back from configuration. This macro provides both conversions from a
//! single variant-to-keyword table with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use harvester_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum PassKind {
//!     Deletions,
//!     Observations,
//! }
//!
//! impl_domain_status_conversions!(PassKind {
//!     Deletions => "deletions",
//!     Observations => "observations",
//! });
//!
//! assert_eq!(PassKind::Deletions.to_string(), "deletions");
//! assert_eq!("OBSERVATIONS".parse::<PassKind>(), Ok(PassKind::Observations));
//! ```

/// Implements Display and FromStr traits for keyword enums
///
/// This macro generates:
/// - Display trait: converts enum variants to lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase keyword
///
/// # Features
///
/// - Case-insensitive parsing (e.g., "PENDING", "pending", "Pending" all work)
/// - Consistent lowercase string output
/// - Descriptive error messages with enum name
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
