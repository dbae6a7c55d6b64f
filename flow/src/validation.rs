use log::debug;
use signup_shared::messages::signup::{AvailabilityStatus, FormField};
use signup_shared::messages::ServiceResult;

/// The fields whose values must be unique across accounts.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CheckedField {
	Email,
	Username,
}

impl CheckedField {
	pub fn form_field(self) -> FormField {
		match self {
			Self::Email => FormField::Email,
			Self::Username => FormField::Username,
		}
	}

	pub fn from_form_field(field: FormField) -> Option<Self> {
		match field {
			FormField::Email => Some(Self::Email),
			FormField::Username => Some(Self::Username),
			FormField::DisplayName | FormField::Password => None,
		}
	}

	pub(crate) fn name(self) -> &'static str {
		match self {
			Self::Email => "email",
			Self::Username => "username",
		}
	}
}

/// Validation state a single checked field is in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CheckStatus {
	Idle,
	Pending,
	Available,
	Unavailable,
	Error(String),
}

/// Async-validation state for one checked field.
#[derive(Clone, Debug)]
pub struct FieldValidation {
	status: CheckStatus,
	last_checked_value: Option<String>,
	in_flight: u32,
}

impl Default for FieldValidation {
	fn default() -> Self {
		Self {
			status: CheckStatus::Idle,
			last_checked_value: None,
			in_flight: 0,
		}
	}
}

impl FieldValidation {
	pub fn status(&self) -> &CheckStatus {
		&self.status
	}

	/// The value the most recently applied check ran against.
	pub fn last_checked_value(&self) -> Option<&str> {
		self.last_checked_value.as_deref()
	}

	/// Field-level error text for a check call that itself failed. Distinct
	/// from an unavailable value, which is a validation outcome rather than
	/// a failure.
	pub fn check_error(&self) -> Option<&str> {
		match &self.status {
			CheckStatus::Error(message) => Some(message),
			_ => None,
		}
	}

	pub fn is_unavailable(&self) -> bool {
		self.status == CheckStatus::Unavailable
	}
}

/// A uniqueness check that has been issued but not yet resolved. Carries the
/// value snapshot taken at issue time; resolution compares the snapshot
/// against the live field value to decide whether the result still applies.
#[derive(Clone, Debug)]
pub struct IssuedCheck {
	pub field: CheckedField,
	pub value: String,
}

/// Issues uniqueness checks as fields lose focus and reconciles their
/// results with whatever the user has typed in the meantime.
#[derive(Debug, Default)]
pub struct ValidationCoordinator {
	email: FieldValidation,
	username: FieldValidation,
}

impl ValidationCoordinator {
	pub fn validation(&self, field: CheckedField) -> &FieldValidation {
		match field {
			CheckedField::Email => &self.email,
			CheckedField::Username => &self.username,
		}
	}

	fn validation_mut(&mut self, field: CheckedField) -> &mut FieldValidation {
		match field {
			CheckedField::Email => &mut self.email,
			CheckedField::Username => &mut self.username,
		}
	}

	/// Handles focus leaving a checked field. An empty value is incomplete
	/// rather than unavailable, so no check is issued for it and any earlier
	/// outcome no longer applies. A non-empty value always gets a fresh
	/// check, even if it is unchanged since the last one; checks already in
	/// flight for the field continue and are reconciled on resolution.
	pub fn on_field_blur(&mut self, field: CheckedField, current_value: &str) -> Option<IssuedCheck> {
		let validation = self.validation_mut(field);
		if current_value.is_empty() {
			validation.status = CheckStatus::Idle;
			validation.last_checked_value = None;
			return None;
		}
		validation.status = CheckStatus::Pending;
		validation.in_flight += 1;
		debug!("Issuing {} availability check for {:?}", field.name(), current_value);
		Some(IssuedCheck {
			field,
			value: current_value.to_owned(),
		})
	}

	/// Applies the outcome of an issued check, unless the field has moved on
	/// to a different value since the check was issued; a stale result is
	/// dropped without installing its outcome. Returns whether the outcome
	/// was applied.
	pub fn apply_check_result(
		&mut self,
		check: &IssuedCheck,
		outcome: ServiceResult<AvailabilityStatus>,
		current_value: &str,
	) -> bool {
		let validation = self.validation_mut(check.field);
		validation.in_flight = validation.in_flight.saturating_sub(1);
		if check.value != current_value {
			debug!(
				"Discarding stale {} check result for {:?}; the field now holds {:?}",
				check.field.name(),
				check.value,
				current_value
			);
			// With nothing left in flight, no result for the current value can
			// arrive anymore, so Pending no longer describes this field.
			if validation.in_flight == 0 && validation.status == CheckStatus::Pending {
				validation.status = CheckStatus::Idle;
			}
			return false;
		}
		validation.status = match outcome {
			Ok(AvailabilityStatus::Available) => CheckStatus::Available,
			Ok(AvailabilityStatus::Unavailable) => CheckStatus::Unavailable,
			Err(error) => CheckStatus::Error(error.message().to_owned()),
		};
		validation.last_checked_value = Some(check.value.clone());
		true
	}

	/// Whether this field's validation state rules out a submission attempt
	/// right now. Only an unresolved check or a failed check call for the
	/// value the field still holds does; a value known to be taken is left
	/// to the account-creation service to reject.
	pub fn blocks_submission(&self, field: CheckedField, current_value: &str) -> bool {
		let validation = self.validation(field);
		match &validation.status {
			CheckStatus::Pending => true,
			CheckStatus::Error(_) => validation.last_checked_value.as_deref() == Some(current_value),
			CheckStatus::Idle | CheckStatus::Available | CheckStatus::Unavailable => false,
		}
	}

	/// Forgets all validation state, as when the flow is closed.
	pub fn reset(&mut self) {
		self.email = FieldValidation::default();
		self.username = FieldValidation::default();
	}
}
