//! Scripted stand-ins for the flow's service capabilities. Calls are parked
//! until the test resolves them, so completion order is entirely under test
//! control.

use crate::services::{AccountService, AvailabilityService, FlowSink, Step};
use crate::validation::CheckedField;
use async_trait::async_trait;
use futures::channel::oneshot;
use signup_shared::messages::signup::{AvailabilityStatus, SignupForm};
use signup_shared::messages::user::NewAccount;
use signup_shared::messages::{ServiceError, ServiceResult};
use std::cell::RefCell;

/// Availability service that parks every check until the test resolves it.
#[derive(Default)]
pub struct HeldAvailability {
	pending: RefCell<Vec<HeldCheck>>,
	calls: RefCell<Vec<(CheckedField, String)>>,
}

struct HeldCheck {
	field: CheckedField,
	value: String,
	sender: oneshot::Sender<ServiceResult<AvailabilityStatus>>,
}

impl HeldAvailability {
	async fn park(&self, field: CheckedField, value: &str) -> ServiceResult<AvailabilityStatus> {
		self.calls.borrow_mut().push((field, value.to_owned()));
		let (sender, receiver) = oneshot::channel();
		self.pending.borrow_mut().push(HeldCheck {
			field,
			value: value.to_owned(),
			sender,
		});
		receiver
			.await
			.unwrap_or_else(|_| Err(ServiceError::new("check abandoned")))
	}

	/// Resolves the oldest parked check for this field and value.
	pub fn resolve(&self, field: CheckedField, value: &str, outcome: ServiceResult<AvailabilityStatus>) {
		let mut pending = self.pending.borrow_mut();
		let index = pending
			.iter()
			.position(|check| check.field == field && check.value == value)
			.unwrap_or_else(|| panic!("no parked {:?} check for {:?}", field, value));
		let check = pending.remove(index);
		let _ = check.sender.send(outcome);
	}

	pub fn calls(&self) -> Vec<(CheckedField, String)> {
		self.calls.borrow().clone()
	}
}

#[async_trait(?Send)]
impl AvailabilityService for HeldAvailability {
	async fn check_email(&self, email: &str) -> ServiceResult<AvailabilityStatus> {
		self.park(CheckedField::Email, email).await
	}

	async fn check_username(&self, username: &str) -> ServiceResult<AvailabilityStatus> {
		self.park(CheckedField::Username, username).await
	}
}

/// Account service that parks sign-up calls the same way.
#[derive(Default)]
pub struct HeldAccounts {
	pending: RefCell<Vec<oneshot::Sender<ServiceResult<NewAccount>>>>,
	calls: RefCell<Vec<SignupForm>>,
}

impl HeldAccounts {
	pub fn resolve_next(&self, outcome: ServiceResult<NewAccount>) {
		let sender = self.pending.borrow_mut().remove(0);
		let _ = sender.send(outcome);
	}

	pub fn call_count(&self) -> usize {
		self.calls.borrow().len()
	}

	pub fn calls(&self) -> Vec<SignupForm> {
		self.calls.borrow().clone()
	}
}

#[async_trait(?Send)]
impl AccountService for HeldAccounts {
	async fn sign_up(&self, form: &SignupForm) -> ServiceResult<NewAccount> {
		self.calls.borrow_mut().push(form.clone());
		let (sender, receiver) = oneshot::channel();
		self.pending.borrow_mut().push(sender);
		receiver
			.await
			.unwrap_or_else(|_| Err(ServiceError::new("signup abandoned")))
	}
}

/// Sink that records everything the flow reports.
#[derive(Default)]
pub struct RecordingSink {
	pub errors: RefCell<Vec<String>>,
	pub steps: RefCell<Vec<Step>>,
}

impl FlowSink for RecordingSink {
	fn notify_error(&self, message: &str) {
		self.errors.borrow_mut().push(message.to_owned());
	}

	fn request_step_transition(&self, step: Step) {
		self.steps.borrow_mut().push(step);
	}
}
