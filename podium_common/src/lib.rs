mod cents;

pub mod op;
mod secret;

pub mod helpers;

pub use cents::{Cents, CentsConversionError, USD_CURRENCY_CODE};
pub use secret::Secret;
