/// Failure reported by a kernel or by argument validation ahead of one.
///
/// Kernel errors are numeric/argument failures of the registry itself. They
/// propagate to the caller unchanged; nothing in this workspace retries them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
	/// Operand shapes cannot be combined.
	#[error("{op}: shape mismatch: {left:?} vs {right:?}")]
	ShapeMismatch {
		op: &'static str,
		left: Vec<usize>,
		right: Vec<usize>,
	},
	/// A scalar or tensor argument is missing or of the wrong form.
	#[error("{op}: invalid argument: {reason}")]
	InvalidArgument { op: &'static str, reason: String },
	/// The requested view cannot be expressed over the existing strides.
	#[error("{op}: view size {requested:?} is not compatible with input size {shape:?} and strides {strides:?}")]
	NotViewable {
		op: &'static str,
		shape: Vec<usize>,
		strides: Vec<usize>,
		requested: Vec<usize>,
	},
	/// A dimension or element index is out of range.
	#[error("{op}: index {index} out of range for dimension of size {size}")]
	IndexOutOfRange { op: &'static str, index: i64, size: usize },
	/// A kernel returned a different number of outputs than its definition declares.
	#[error("{op}: expected {expected} output(s), kernel produced {actual}")]
	Arity {
		op: String,
		expected: String,
		actual: usize,
	},
}

impl KernelError {
	/// Shorthand for [`KernelError::InvalidArgument`].
	pub fn invalid(op: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidArgument {
			op,
			reason: reason.into(),
		}
	}
}

/// Registry construction and lookup errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
	/// Two definitions share the same operation name.
	#[error("duplicate operation: {name} (registry {registry})")]
	DuplicateOp {
		registry: &'static str,
		name: &'static str,
	},
	/// No definition is registered under the requested name.
	#[error("unknown operation: {name}{}", suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
	UnknownOp {
		name: String,
		suggestion: Option<&'static str>,
	},
	#[error(transparent)]
	Kernel(#[from] KernelError),
}

/// Result type for kernels.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
