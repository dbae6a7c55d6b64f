use serde::{Deserialize, Serialize};
use std::fmt;

pub mod signup;
pub mod user;

/// Failure reported by a backing service, carrying text suitable for
/// display to the user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServiceError {
	message: String,
}

impl ServiceError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

impl fmt::Display for ServiceError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.message)
	}
}

pub type ServiceResult<T> = Result<T, ServiceError>;
