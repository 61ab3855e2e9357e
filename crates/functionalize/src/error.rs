use core::fmt;

use purify_registry::{KernelError, RegistryError};

use crate::config::ConfigError;

/// Caller misuse of the toggle or of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidState {
	#[error("functionalization is already enabled")]
	AlreadyEnabled,
	#[error("functionalization is already disabled")]
	AlreadyDisabled,
	/// The handle's entry is not in the alias graph.
	#[error("tensor is not registered in the alias graph")]
	UnknownTensor,
	/// The handle was created by another session.
	#[error("tensor belongs to a different functionalization session")]
	ForeignTensor,
	/// A tracked operand reached the session while interception was off.
	#[error("tracked tensor used while functionalization is disabled")]
	TrackedWhileDisabled,
}

/// Why an operation cannot be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
	/// No definition under that symbol.
	UnknownOp { suggestion: Option<&'static str> },
	/// A view op without a scatter form.
	MissingScatter,
	/// The pure/view counterpart named by the definition is not registered.
	MissingCounterpart(&'static str),
	/// The counterpart exists but has the wrong kind.
	CounterpartKind {
		counterpart: &'static str,
		expected: &'static str,
	},
}

impl fmt::Display for UnsupportedReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnknownOp { suggestion: None } => f.write_str("unknown operation"),
			Self::UnknownOp {
				suggestion: Some(s),
			} => write!(f, "unknown operation (did you mean '{s}'?)"),
			Self::MissingScatter => f.write_str("view has no scatter form"),
			Self::MissingCounterpart(name) => write!(f, "counterpart '{name}' is not registered"),
			Self::CounterpartKind {
				counterpart,
				expected,
			} => write!(f, "counterpart '{counterpart}' is not a {expected} op"),
		}
	}
}

/// Errors surfaced by a functionalization session.
///
/// Kernel failures pass through unchanged. Nothing is retried, and a failed
/// call leaves previously committed state as it was.
#[derive(Debug, thiserror::Error)]
pub enum FunctionalizeError {
	#[error("invalid state: {0}")]
	InvalidState(#[from] InvalidState),
	#[error("unsupported operation {op}: {reason}")]
	Unsupported { op: String, reason: UnsupportedReason },
	/// Replaying a recorded multi-output view produced a different number of
	/// results than when the view was created.
	#[error("alias inconsistency replaying {op}: expected {expected} output(s), got {actual}")]
	AliasInconsistency {
		op: &'static str,
		expected: usize,
		actual: usize,
	},
	#[error(transparent)]
	Registry(RegistryError),
	#[error(transparent)]
	Kernel(#[from] KernelError),
	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl FunctionalizeError {
	pub(crate) fn unsupported(op: impl Into<String>, reason: UnsupportedReason) -> Self {
		Self::Unsupported {
			op: op.into(),
			reason,
		}
	}
}

/// Unknown symbols are an unsupported operation from the engine's point of
/// view; kernel failures keep their own variant.
impl From<RegistryError> for FunctionalizeError {
	fn from(err: RegistryError) -> Self {
		match err {
			RegistryError::UnknownOp { name, suggestion } => {
				Self::unsupported(name, UnsupportedReason::UnknownOp { suggestion })
			}
			RegistryError::Kernel(err) => Self::Kernel(err),
			other => Self::Registry(other),
		}
	}
}

pub type Result<T> = std::result::Result<T, FunctionalizeError>;
