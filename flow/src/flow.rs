use crate::error::FlowError;
use crate::services::{AccountService, AvailabilityService, FlowSink, FormStore, Step};
use crate::submission::{self, SubmissionController, SubmissionStatus};
use crate::validation::{CheckStatus, CheckedField, ValidationCoordinator};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::debug;
use signup_shared::messages::signup::{FormField, SignupForm};
use std::cell::RefCell;
use std::rc::Rc;

/// State-change notifications for a presentation layer. Subscribing is
/// optional; the flow's accessors always reflect current state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FlowEvent {
	FieldEdited { field: FormField },
	ValidationChanged { field: CheckedField, status: CheckStatus },
	SubmissionChanged { status: SubmissionStatus },
	FormCleared,
	Closed,
}

struct FlowState {
	store: Box<dyn FormStore>,
	validations: ValidationCoordinator,
	submission: SubmissionController,
	// Bumped when the flow closes; async work carries the epoch it was
	// issued under and is dropped on resolution if the epochs differ.
	epoch: u64,
	subscribers: Vec<UnboundedSender<FlowEvent>>,
}

impl FlowState {
	fn emit(&mut self, event: FlowEvent) {
		self.subscribers
			.retain(|subscriber| subscriber.unbounded_send(event.clone()).is_ok());
	}

	fn field_value(&self, field: CheckedField) -> String {
		self.store.read().field(field.form_field()).to_owned()
	}
}

/// One end-to-end registration attempt, from first edit to account creation
/// or abandonment.
///
/// The flow owns its form store and validation state outright and talks to
/// the outside world only through the capabilities injected at
/// construction. Everything runs on a single thread; service calls are
/// spawned onto the provided executor and re-enter the flow as resolution
/// events, so editing is never blocked by a check in flight.
pub struct SignupFlow {
	state: Rc<RefCell<FlowState>>,
	availability: Rc<dyn AvailabilityService>,
	accounts: Rc<dyn AccountService>,
	sink: Rc<dyn FlowSink>,
	spawner: Box<dyn LocalSpawn>,
}

impl SignupFlow {
	pub fn new(
		store: Box<dyn FormStore>,
		availability: Rc<dyn AvailabilityService>,
		accounts: Rc<dyn AccountService>,
		sink: Rc<dyn FlowSink>,
		spawner: Box<dyn LocalSpawn>,
	) -> Self {
		Self {
			state: Rc::new(RefCell::new(FlowState {
				store,
				validations: ValidationCoordinator::default(),
				submission: SubmissionController::default(),
				epoch: 0,
				subscribers: Vec::new(),
			})),
			availability,
			accounts,
			sink,
			spawner,
		}
	}

	/// Registers a subscriber for state-change events. Subscriptions end
	/// when the flow closes.
	pub fn subscribe(&self) -> UnboundedReceiver<FlowEvent> {
		let (sender, receiver) = unbounded();
		self.state.borrow_mut().subscribers.push(sender);
		receiver
	}

	pub fn form(&self) -> SignupForm {
		self.state.borrow().store.read()
	}

	pub fn validation_status(&self, field: CheckedField) -> CheckStatus {
		self.state.borrow().validations.validation(field).status().clone()
	}

	pub fn submission_status(&self) -> SubmissionStatus {
		self.state.borrow().submission.status().clone()
	}

	/// Applies a field edit. Edits are synchronous and unconditional; they
	/// never wait on validation work.
	pub fn field_edited(&self, field: FormField, value: &str) {
		let mut state = self.state.borrow_mut();
		state.store.update(field, value);
		state.emit(FlowEvent::FieldEdited { field });
	}

	/// Handles focus leaving a field. For email and username this issues a
	/// uniqueness check against the value the field holds right now; other
	/// fields have nothing to check.
	pub fn field_blurred(&self, field: FormField) -> Result<(), FlowError> {
		let Some(checked) = CheckedField::from_form_field(field) else {
			return Ok(());
		};
		let mut state = self.state.borrow_mut();
		let current = state.field_value(checked);
		let previous = state.validations.validation(checked).status().clone();
		let issued = state.validations.on_field_blur(checked, &current);
		let status = state.validations.validation(checked).status().clone();
		if status != previous {
			state.emit(FlowEvent::ValidationChanged { field: checked, status });
		}
		let Some(check) = issued else {
			return Ok(());
		};
		let epoch = state.epoch;
		drop(state);

		let state = Rc::clone(&self.state);
		let availability = Rc::clone(&self.availability);
		self.spawner.spawn_local(async move {
			let outcome = match check.field {
				CheckedField::Email => availability.check_email(&check.value).await,
				CheckedField::Username => availability.check_username(&check.value).await,
			};
			let mut state = state.borrow_mut();
			if state.epoch != epoch {
				debug!("Dropping a check result that resolved after the flow closed");
				return;
			}
			let current = state.field_value(check.field);
			let previous = state.validations.validation(check.field).status().clone();
			state.validations.apply_check_result(&check, outcome, &current);
			let status = state.validations.validation(check.field).status().clone();
			if status != previous {
				state.emit(FlowEvent::ValidationChanged {
					field: check.field,
					status,
				});
			}
		})?;
		Ok(())
	}

	/// Whether a submission attempt may be made with the current form and
	/// validation state.
	pub fn can_submit(&self) -> bool {
		let state = self.state.borrow();
		submission::can_submit(&state.store.read(), &state.validations)
	}

	/// Attempts to create the account from the current form. Does nothing
	/// if the form is not submittable or an attempt is already in flight.
	/// On success the form and all validation state are cleared and the
	/// user is handed off to the verification step in a single transition;
	/// on failure the form is kept as entered so it can be corrected and
	/// resubmitted.
	pub fn submit(&self) -> Result<(), FlowError> {
		let mut state = self.state.borrow_mut();
		let form = state.store.read();
		if !submission::can_submit(&form, &state.validations) {
			debug!("Ignoring signup attempt while the form is not submittable");
			return Ok(());
		}
		let Some(request) = state.submission.begin(form) else {
			return Ok(());
		};
		let epoch = state.epoch;
		state.emit(FlowEvent::SubmissionChanged {
			status: SubmissionStatus::InFlight,
		});
		drop(state);

		let state = Rc::clone(&self.state);
		let accounts = Rc::clone(&self.accounts);
		let sink = Rc::clone(&self.sink);
		self.spawner.spawn_local(async move {
			let outcome = accounts.sign_up(&request.form).await;
			let mut flow_state = state.borrow_mut();
			if flow_state.epoch != epoch {
				debug!("Dropping a signup outcome that resolved after the flow closed");
				return;
			}
			flow_state.submission.resolve(&outcome);
			match outcome {
				Ok(account) => {
					flow_state.emit(FlowEvent::SubmissionChanged {
						status: SubmissionStatus::Succeeded(account.id.clone()),
					});
					flow_state.store.clear();
					flow_state.validations.reset();
					flow_state.submission.reset();
					flow_state.emit(FlowEvent::FormCleared);
					drop(flow_state);
					sink.request_step_transition(Step::Verification { user_id: account.id });
				}
				Err(error) => {
					flow_state.emit(FlowEvent::SubmissionChanged {
						status: SubmissionStatus::Failed(error.message().to_owned()),
					});
					drop(flow_state);
					sink.notify_error(error.message());
				}
			}
		})?;
		Ok(())
	}

	/// Abandons the flow: the form and all validation state are cleared,
	/// event subscribers are detached, and anything still in flight
	/// resolves without effect. The underlying service calls are not
	/// aborted.
	pub fn close(&self) {
		let mut state = self.state.borrow_mut();
		state.epoch += 1;
		state.store.clear();
		state.validations.reset();
		state.submission.reset();
		state.emit(FlowEvent::Closed);
		state.subscribers.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::{HeldAccounts, HeldAvailability, RecordingSink};
	use crate::store::MemoryFormStore;
	use futures::executor::LocalPool;
	use signup_shared::messages::signup::AvailabilityStatus;
	use signup_shared::messages::user::NewAccount;
	use signup_shared::messages::ServiceError;

	struct Harness {
		pool: LocalPool,
		flow: SignupFlow,
		availability: Rc<HeldAvailability>,
		accounts: Rc<HeldAccounts>,
		sink: Rc<RecordingSink>,
	}

	impl Harness {
		fn new() -> Self {
			let pool = LocalPool::new();
			let availability = Rc::new(HeldAvailability::default());
			let accounts = Rc::new(HeldAccounts::default());
			let sink = Rc::new(RecordingSink::default());
			let flow = SignupFlow::new(
				Box::new(MemoryFormStore::default()),
				Rc::clone(&availability) as Rc<dyn AvailabilityService>,
				Rc::clone(&accounts) as Rc<dyn AccountService>,
				Rc::clone(&sink) as Rc<dyn FlowSink>,
				Box::new(pool.spawner()),
			);
			Self {
				pool,
				flow,
				availability,
				accounts,
				sink,
			}
		}

		fn fill_form(&self) {
			self.flow.field_edited(FormField::DisplayName, "Ada");
			self.flow.field_edited(FormField::Email, "ada@x.com");
			self.flow.field_edited(FormField::Username, "ada");
			self.flow.field_edited(FormField::Password, "longenough");
		}

		fn run(&mut self) {
			self.pool.run_until_stalled();
		}
	}

	#[test]
	fn successful_signup_clears_the_form_and_requests_verification() {
		let mut harness = Harness::new();
		harness.fill_form();
		harness.flow.field_blurred(FormField::Email).unwrap();
		harness.flow.field_blurred(FormField::Username).unwrap();
		harness.run();
		harness
			.availability
			.resolve(CheckedField::Email, "ada@x.com", Ok(AvailabilityStatus::Available));
		harness
			.availability
			.resolve(CheckedField::Username, "ada", Ok(AvailabilityStatus::Available));
		harness.run();
		assert!(harness.flow.can_submit());
		harness.flow.submit().unwrap();
		harness.run();
		assert_eq!(
			harness.accounts.calls(),
			vec![SignupForm {
				display_name: String::from("Ada"),
				email: String::from("ada@x.com"),
				username: String::from("ada"),
				password: String::from("longenough"),
			}]
		);
		harness.accounts.resolve_next(Ok(NewAccount {
			id: String::from("42"),
		}));
		harness.run();
		assert_eq!(harness.flow.form(), SignupForm::default());
		assert_eq!(harness.flow.validation_status(CheckedField::Email), CheckStatus::Idle);
		assert_eq!(harness.flow.validation_status(CheckedField::Username), CheckStatus::Idle);
		assert_eq!(harness.flow.submission_status(), SubmissionStatus::Idle);
		assert_eq!(
			*harness.sink.steps.borrow(),
			vec![Step::Verification {
				user_id: String::from("42"),
			}]
		);
		assert!(harness.sink.errors.borrow().is_empty());
	}

	#[test]
	fn check_result_for_a_superseded_value_is_discarded() {
		let mut harness = Harness::new();
		harness.flow.field_edited(FormField::Username, "ada");
		harness.flow.field_blurred(FormField::Username).unwrap();
		harness.flow.field_edited(FormField::Username, "ada_lovelace");
		harness.flow.field_blurred(FormField::Username).unwrap();
		harness.run();
		// The older check resolves first and must not win.
		harness
			.availability
			.resolve(CheckedField::Username, "ada", Ok(AvailabilityStatus::Unavailable));
		harness.run();
		assert_eq!(
			harness.flow.validation_status(CheckedField::Username),
			CheckStatus::Pending
		);
		harness.availability.resolve(
			CheckedField::Username,
			"ada_lovelace",
			Ok(AvailabilityStatus::Available),
		);
		harness.run();
		assert_eq!(
			harness.flow.validation_status(CheckedField::Username),
			CheckStatus::Available
		);
	}

	#[test]
	fn blurring_an_empty_field_issues_no_check() {
		let mut harness = Harness::new();
		harness.flow.field_blurred(FormField::Email).unwrap();
		harness.run();
		assert!(harness.availability.calls().is_empty());
		assert_eq!(harness.flow.validation_status(CheckedField::Email), CheckStatus::Idle);
	}

	#[test]
	fn edits_apply_in_order_regardless_of_pending_checks() {
		let mut harness = Harness::new();
		harness.flow.field_edited(FormField::Email, "a@x.com");
		harness.flow.field_blurred(FormField::Email).unwrap();
		harness.flow.field_edited(FormField::Email, "b@x.com");
		harness.flow.field_edited(FormField::Email, "c@x.com");
		harness.run();
		assert_eq!(harness.flow.form().email, "c@x.com");
	}

	#[test]
	fn unavailable_username_still_submits_and_the_service_rejects() {
		let mut harness = Harness::new();
		harness.fill_form();
		harness.flow.field_blurred(FormField::Username).unwrap();
		harness.run();
		harness
			.availability
			.resolve(CheckedField::Username, "ada", Ok(AvailabilityStatus::Unavailable));
		harness.run();
		assert_eq!(
			harness.flow.validation_status(CheckedField::Username),
			CheckStatus::Unavailable
		);
		assert!(harness.flow.can_submit());
		harness.flow.submit().unwrap();
		harness.run();
		assert_eq!(harness.accounts.call_count(), 1);
		harness
			.accounts
			.resolve_next(Err(ServiceError::new("username already taken")));
		harness.run();
		assert_eq!(*harness.sink.errors.borrow(), vec![String::from("username already taken")]);
		assert!(harness.sink.steps.borrow().is_empty());
		assert_eq!(harness.flow.form().username, "ada");
		assert_eq!(
			harness.flow.validation_status(CheckedField::Username),
			CheckStatus::Unavailable
		);
	}

	#[test]
	fn rejected_signup_notifies_once_and_keeps_the_form() {
		let mut harness = Harness::new();
		harness.fill_form();
		harness.flow.submit().unwrap();
		harness.run();
		harness
			.accounts
			.resolve_next(Err(ServiceError::new("email already registered")));
		harness.run();
		assert_eq!(
			*harness.sink.errors.borrow(),
			vec![String::from("email already registered")]
		);
		assert!(harness.sink.steps.borrow().is_empty());
		let form = harness.flow.form();
		assert_eq!(form.email, "ada@x.com");
		assert_eq!(form.password, "longenough");
		assert_eq!(
			harness.flow.submission_status(),
			SubmissionStatus::Failed(String::from("email already registered"))
		);
	}

	#[test]
	fn submit_while_in_flight_does_not_call_the_service_again() {
		let mut harness = Harness::new();
		harness.fill_form();
		harness.flow.submit().unwrap();
		harness.run();
		harness.flow.submit().unwrap();
		harness.run();
		assert_eq!(harness.accounts.call_count(), 1);
		harness.accounts.resolve_next(Ok(NewAccount {
			id: String::from("42"),
		}));
		harness.run();
		assert_eq!(harness.sink.steps.borrow().len(), 1);
	}

	#[test]
	fn incomplete_form_is_not_submitted() {
		let mut harness = Harness::new();
		harness.flow.field_edited(FormField::DisplayName, "Ada");
		assert!(!harness.flow.can_submit());
		harness.flow.submit().unwrap();
		harness.run();
		assert_eq!(harness.accounts.call_count(), 0);
	}

	#[test]
	fn closing_discards_in_flight_checks() {
		let mut harness = Harness::new();
		harness.flow.field_edited(FormField::Username, "bob");
		harness.flow.field_blurred(FormField::Username).unwrap();
		harness.run();
		harness.flow.close();
		harness
			.availability
			.resolve(CheckedField::Username, "bob", Ok(AvailabilityStatus::Unavailable));
		harness.run();
		assert_eq!(harness.flow.validation_status(CheckedField::Username), CheckStatus::Idle);
		assert_eq!(harness.flow.validation_status(CheckedField::Email), CheckStatus::Idle);
		assert_eq!(harness.flow.form(), SignupForm::default());
	}

	#[test]
	fn closing_discards_an_in_flight_submission() {
		let mut harness = Harness::new();
		harness.fill_form();
		harness.flow.submit().unwrap();
		harness.run();
		harness.flow.close();
		harness.accounts.resolve_next(Ok(NewAccount {
			id: String::from("42"),
		}));
		harness.run();
		assert!(harness.sink.steps.borrow().is_empty());
		assert_eq!(harness.flow.submission_status(), SubmissionStatus::Idle);
	}

	#[test]
	fn subscribers_see_validation_transitions() {
		let mut harness = Harness::new();
		let mut events = harness.flow.subscribe();
		harness.flow.field_edited(FormField::Username, "ada");
		harness.flow.field_blurred(FormField::Username).unwrap();
		harness.run();
		harness
			.availability
			.resolve(CheckedField::Username, "ada", Ok(AvailabilityStatus::Available));
		harness.run();
		let mut seen = Vec::new();
		while let Ok(Some(event)) = events.try_next() {
			seen.push(event);
		}
		assert_eq!(
			seen,
			vec![
				FlowEvent::FieldEdited {
					field: FormField::Username,
				},
				FlowEvent::ValidationChanged {
					field: CheckedField::Username,
					status: CheckStatus::Pending,
				},
				FlowEvent::ValidationChanged {
					field: CheckedField::Username,
					status: CheckStatus::Available,
				},
			]
		);
	}
}
