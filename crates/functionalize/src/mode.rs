//! Interception toggle.
//!
//! One flag per thread, off by default. Enabling twice or disabling twice is a
//! caller error; scoped use goes through [`FunctionalizationGuard`], which
//! disables on every exit path including unwinding.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::error::InvalidState;

thread_local! {
	static ENABLED: Cell<bool> = const { Cell::new(false) };
}

pub fn is_enabled() -> bool {
	ENABLED.with(Cell::get)
}

pub fn enable() -> Result<(), InvalidState> {
	ENABLED.with(|flag| {
		if flag.replace(true) {
			return Err(InvalidState::AlreadyEnabled);
		}
		tracing::trace!("functionalize.enable");
		Ok(())
	})
}

pub fn disable() -> Result<(), InvalidState> {
	ENABLED.with(|flag| {
		if !flag.replace(false) {
			return Err(InvalidState::AlreadyDisabled);
		}
		tracing::trace!("functionalize.disable");
		Ok(())
	})
}

/// Enables interception for its lifetime.
///
/// Tied to the thread that created it.
#[must_use = "functionalization is disabled again when the guard drops"]
pub struct FunctionalizationGuard {
	_thread: PhantomData<*const ()>,
}

impl FunctionalizationGuard {
	pub fn new() -> Result<Self, InvalidState> {
		enable()?;
		Ok(Self { _thread: PhantomData })
	}
}

impl Drop for FunctionalizationGuard {
	fn drop(&mut self) {
		if disable().is_err() {
			tracing::warn!("functionalize.guard: already disabled inside the guarded scope");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_toggle_rejects_nesting() {
		assert!(!is_enabled());
		enable().unwrap();
		assert_eq!(enable(), Err(InvalidState::AlreadyEnabled));
		assert!(is_enabled());
		disable().unwrap();
		assert_eq!(disable(), Err(InvalidState::AlreadyDisabled));
	}

	#[test]
	fn test_guard_disables_on_unwind() {
		let result = std::panic::catch_unwind(|| {
			let _guard = FunctionalizationGuard::new().unwrap();
			assert!(is_enabled());
			panic!("user code failed");
		});
		assert!(result.is_err());
		assert!(!is_enabled());
	}

	#[test]
	fn test_guard_refuses_when_enabled() {
		let _outer = FunctionalizationGuard::new().unwrap();
		assert!(matches!(FunctionalizationGuard::new(), Err(InvalidState::AlreadyEnabled)));
		assert!(is_enabled());
	}
}
