use async_trait::async_trait;
use signup_shared::messages::signup::{AvailabilityStatus, FormField, SignupForm};
use signup_shared::messages::user::NewAccount;
use signup_shared::messages::ServiceResult;

/// Holds the field values for one signup attempt.
///
/// A flow takes exclusive ownership of its store; a store is never shared
/// between concurrently open flows.
pub trait FormStore {
	fn read(&self) -> SignupForm;
	fn update(&mut self, field: FormField, value: &str);
	fn clear(&mut self);
}

/// Uniqueness checks for values that must not collide with existing
/// accounts. Implementations must tolerate repeated and overlapping calls
/// for the same or different fields.
#[async_trait(?Send)]
pub trait AvailabilityService {
	async fn check_email(&self, email: &str) -> ServiceResult<AvailabilityStatus>;
	async fn check_username(&self, username: &str) -> ServiceResult<AvailabilityStatus>;
}

/// Account creation from a completed signup form.
#[async_trait(?Send)]
pub trait AccountService {
	async fn sign_up(&self, form: &SignupForm) -> ServiceResult<NewAccount>;
}

/// The step a flow can hand the user off to once it is done with them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step {
	Verification { user_id: String },
}

/// Where the flow reports user-visible failures and requests transitions to
/// follow-up steps. Both calls are fire-and-forget.
pub trait FlowSink {
	fn notify_error(&self, message: &str);
	fn request_step_transition(&self, step: Step);
}
