use crate::services::FormStore;
use signup_shared::messages::signup::{FormField, SignupForm};

/// In-memory form store for flows that do not share their field values with
/// a wider application state.
#[derive(Debug, Default)]
pub struct MemoryFormStore {
	form: SignupForm,
}

impl FormStore for MemoryFormStore {
	fn read(&self) -> SignupForm {
		self.form.clone()
	}

	fn update(&mut self, field: FormField, value: &str) {
		self.form.set_field(field, value);
	}

	fn clear(&mut self) {
		self.form = SignupForm::default();
	}
}
