mod client;
mod diff;
mod error;
mod logger;
mod protocol;
mod resolver;
mod token;
mod transport;
mod types;

pub use client::{SalusClient, SalusClientBuilder};
pub use error::{AuthError, Error, ReadError, Result, WriteError};
pub use logger::MessageLogMode;
pub use protocol::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use resolver::{FieldKeys, Payload, resolve, to_f64, to_text};
pub use types::*;
