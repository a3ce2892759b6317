pub mod error;

pub use error::{ErrorBody, GatewayError};
