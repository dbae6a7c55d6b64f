use futures::task::SpawnError;
use std::fmt;

/// Errors the flow itself can produce. Service failures are not among them;
/// those are folded into validation or submission state at the point the
/// service call was issued.
#[derive(Debug)]
pub enum FlowError {
	Spawn(SpawnError),
}

impl From<SpawnError> for FlowError {
	fn from(error: SpawnError) -> Self {
		Self::Spawn(error)
	}
}

impl fmt::Display for FlowError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Spawn(error) => write!(f, "Failed to start a background task: {}", error),
		}
	}
}
