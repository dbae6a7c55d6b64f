use serde::{Deserialize, Serialize};

/// A signup form as the user has filled it in so far. Every field defaults
/// to empty and is independently editable; no field is ever absent.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SignupForm {
	pub display_name: String,
	pub email: String,
	pub username: String,
	pub password: String,
}

impl SignupForm {
	pub fn field(&self, field: FormField) -> &str {
		match field {
			FormField::DisplayName => &self.display_name,
			FormField::Email => &self.email,
			FormField::Username => &self.username,
			FormField::Password => &self.password,
		}
	}

	pub fn set_field(&mut self, field: FormField, value: &str) {
		let slot = match field {
			FormField::DisplayName => &mut self.display_name,
			FormField::Email => &mut self.email,
			FormField::Username => &mut self.username,
			FormField::Password => &mut self.password,
		};
		*slot = value.to_owned();
	}

	/// Whether every field required for account creation has been entered.
	pub fn is_complete(&self) -> bool {
		!self.display_name.is_empty()
			&& !self.email.is_empty()
			&& !self.username.is_empty()
			&& !self.password.is_empty()
	}
}

/// Identifies a single form field in edit and blur events.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FormField {
	DisplayName,
	Email,
	Username,
	Password,
}

/// Response data for a single uniqueness check.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AvailabilityStatus {
	Available,
	Unavailable,
}
