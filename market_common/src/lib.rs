//! Value types shared by the sample marketplace crates.
//!
//! * [`Tokens`] is the in-app currency that samples are priced in.
//! * [`MinorUnits`] is a real-world currency amount, expressed in its smallest unit (e.g. kopecks).
//! * [`Secret`] hides configuration values from logs.
mod amounts;
mod helpers;

pub mod op;
mod secret;

pub use amounts::{tokens_for_amount, AmountParseError, MinorUnits, Tokens, DEFAULT_CURRENCY_CODE, MINOR_UNITS_PER_MAJOR};
pub use helpers::{env_or_default, parse_boolean_flag};
pub use secret::Secret;
