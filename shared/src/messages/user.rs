use serde::{Deserialize, Serialize};

/// Data for a newly created account, as returned by the account-creation
/// service.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct NewAccount {
	pub id: String,
}
