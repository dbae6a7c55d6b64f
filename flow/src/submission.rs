use crate::validation::{CheckedField, ValidationCoordinator};
use log::debug;
use signup_shared::messages::signup::SignupForm;
use signup_shared::messages::user::NewAccount;
use signup_shared::messages::ServiceResult;

/// Where a submission attempt stands.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SubmissionStatus {
	#[default]
	Idle,
	InFlight,
	Succeeded(String),
	Failed(String),
}

/// Whether a submission attempt may be made right now: every field filled
/// in, and no checked field with an unresolved or failed check for the
/// value it currently holds. A value known to be taken does not disable
/// submission; the account-creation service has the final say and rejects
/// it then.
pub fn can_submit(form: &SignupForm, validations: &ValidationCoordinator) -> bool {
	if !form.is_complete() {
		return false;
	}
	!validations.blocks_submission(CheckedField::Email, &form.email)
		&& !validations.blocks_submission(CheckedField::Username, &form.username)
}

/// A submission that has been started and not yet resolved. Carries the
/// form snapshot the account-creation call is made with.
#[derive(Clone, Debug)]
pub struct SubmissionRequest {
	pub form: SignupForm,
}

/// Runs account creation for a completed form, one attempt at a time.
#[derive(Debug, Default)]
pub struct SubmissionController {
	status: SubmissionStatus,
}

impl SubmissionController {
	pub fn status(&self) -> &SubmissionStatus {
		&self.status
	}

	/// Starts a submission with a snapshot of the form. While one is in
	/// flight, further attempts are ignored so that a double-press cannot
	/// create two accounts.
	pub fn begin(&mut self, form: SignupForm) -> Option<SubmissionRequest> {
		if self.status == SubmissionStatus::InFlight {
			debug!("Ignoring signup attempt while one is already in flight");
			return None;
		}
		self.status = SubmissionStatus::InFlight;
		Some(SubmissionRequest { form })
	}

	/// Records the outcome of the account-creation call.
	pub fn resolve(&mut self, outcome: &ServiceResult<NewAccount>) {
		self.status = match outcome {
			Ok(account) => SubmissionStatus::Succeeded(account.id.clone()),
			Err(error) => SubmissionStatus::Failed(error.message().to_owned()),
		};
	}

	/// Discards the attempt along with the cleared form.
	pub fn reset(&mut self) {
		self.status = SubmissionStatus::Idle;
	}
}
