use core::fmt;

use smallvec::SmallVec;

use crate::error::KernelResult;
use crate::value::{Arity, Outputs, Scalar};

/// Direct form of an operation: tensors first, scalars second.
pub type Kernel<V> = fn(&[V], &[Scalar]) -> KernelResult<Outputs<V>>;

/// Builds the plan that writes an updated view back into its base.
///
/// Arguments are the current base value, the scalars the view was taken with,
/// and the output index for multi-output views.
pub type ScatterFn<V> = fn(&V, &[Scalar], usize) -> KernelResult<ScatterPlan>;

/// How an operation relates inputs to outputs.
pub enum OpKind<V> {
	/// Fresh outputs, no input mutated, no aliasing.
	Pure,
	/// Outputs alias the first tensor operand.
	View {
		/// Inverse of the view; `None` leaves the op unusable on mutated views.
		scatter: Option<ScatterFn<V>>,
	},
	/// Mutates the first tensor operand's contents.
	InPlace {
		/// Pure counterpart with identical arguments.
		functional: &'static str,
	},
	/// Mutates the first tensor operand's metadata, turning it into a view of its old self.
	InPlaceView {
		/// View counterpart with identical arguments.
		functional: &'static str,
	},
	/// Assigns the second tensor operand into the first.
	CopyInto {
		/// Pure op producing a value equal to the source, shaped like the destination.
		/// Invoked as `substitute(src, dst_shape)`.
		substitute: &'static str,
	},
}

impl<V> OpKind<V> {
	/// Short label used in logs and error messages.
	pub fn label(&self) -> &'static str {
		match self {
			Self::Pure => "pure",
			Self::View { .. } => "view",
			Self::InPlace { .. } => "inplace",
			Self::InPlaceView { .. } => "inplace_view",
			Self::CopyInto { .. } => "copy_into",
		}
	}

	pub fn is_pure(&self) -> bool {
		matches!(self, Self::Pure)
	}

	pub fn is_view(&self) -> bool {
		matches!(self, Self::View { .. })
	}
}

impl<V> Clone for OpKind<V> {
	fn clone(&self) -> Self {
		match self {
			Self::Pure => Self::Pure,
			Self::View { scatter } => Self::View { scatter: *scatter },
			Self::InPlace { functional } => Self::InPlace {
				functional: *functional,
			},
			Self::InPlaceView { functional } => Self::InPlaceView {
				functional: *functional,
			},
			Self::CopyInto { substitute } => Self::CopyInto {
				substitute: *substitute,
			},
		}
	}
}

impl<V> fmt::Debug for OpKind<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pure => f.write_str("Pure"),
			Self::View { scatter } => f
				.debug_struct("View")
				.field("scatter", &scatter.is_some())
				.finish(),
			Self::InPlace { functional } => f
				.debug_struct("InPlace")
				.field("functional", functional)
				.finish(),
			Self::InPlaceView { functional } => f
				.debug_struct("InPlaceView")
				.field("functional", functional)
				.finish(),
			Self::CopyInto { substitute } => f
				.debug_struct("CopyInto")
				.field("substitute", substitute)
				.finish(),
		}
	}
}

/// Registry entry for one operation symbol.
pub struct OpDef<V> {
	/// Operation symbol, e.g. `"diagonal"`.
	pub name: &'static str,
	/// Help text.
	pub description: &'static str,
	pub kind: OpKind<V>,
	pub arity: Arity,
	/// Direct form. For mutating kinds this mutates its first operand.
	pub kernel: Kernel<V>,
}

impl<V> OpDef<V> {
	/// Creates a single-output pure definition.
	pub fn pure(name: &'static str, description: &'static str, kernel: Kernel<V>) -> Self {
		Self {
			name,
			description,
			kind: OpKind::Pure,
			arity: Arity::Single,
			kernel,
		}
	}

	/// Creates a single-output view definition.
	pub fn view(
		name: &'static str,
		description: &'static str,
		kernel: Kernel<V>,
		scatter: ScatterFn<V>,
	) -> Self {
		Self {
			name,
			description,
			kind: OpKind::View {
				scatter: Some(scatter),
			},
			arity: Arity::Single,
			kernel,
		}
	}

	/// Creates an in-place definition backed by a pure counterpart.
	pub fn in_place(
		name: &'static str,
		description: &'static str,
		kernel: Kernel<V>,
		functional: &'static str,
	) -> Self {
		Self {
			name,
			description,
			kind: OpKind::InPlace { functional },
			arity: Arity::Single,
			kernel,
		}
	}

	/// Creates an in-place view definition backed by a view counterpart.
	pub fn in_place_view(
		name: &'static str,
		description: &'static str,
		kernel: Kernel<V>,
		functional: &'static str,
	) -> Self {
		Self {
			name,
			description,
			kind: OpKind::InPlaceView { functional },
			arity: Arity::Single,
			kernel,
		}
	}

	/// Creates a copy-into definition backed by a broadcasting substitute.
	pub fn copy_into(
		name: &'static str,
		description: &'static str,
		kernel: Kernel<V>,
		substitute: &'static str,
	) -> Self {
		Self {
			name,
			description,
			kind: OpKind::CopyInto { substitute },
			arity: Arity::Single,
			kernel,
		}
	}

	/// Marks the definition as producing several results.
	pub fn multi(mut self) -> Self {
		self.arity = Arity::Multi;
		self
	}

	/// Returns the scatter form if this is a view with a registered inverse.
	pub fn scatter(&self) -> Option<ScatterFn<V>> {
		match self.kind {
			OpKind::View { scatter } => scatter,
			_ => None,
		}
	}
}

impl<V> fmt::Debug for OpDef<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OpDef")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("arity", &self.arity)
			.finish_non_exhaustive()
	}
}

/// Operand slot of a [`ScatterStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterOperand {
	/// The base value the view was taken from.
	Base,
	/// The running updated value: the mutated view for the first step, the
	/// previous step's result afterwards.
	Update,
}

/// One registered operation issued while writing a view back into its base.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterStep {
	pub op: &'static str,
	pub operands: SmallVec<[ScatterOperand; 2]>,
	pub scalars: SmallVec<[Scalar; 4]>,
}

impl ScatterStep {
	/// `op(base, update, scalars..)`, the shape of a dedicated scatter kernel.
	pub fn scatter(op: &'static str, scalars: impl IntoIterator<Item = Scalar>) -> Self {
		Self {
			op,
			operands: SmallVec::from_slice(&[ScatterOperand::Base, ScatterOperand::Update]),
			scalars: scalars.into_iter().collect(),
		}
	}

	/// `op(update, scalars..)`, the shape of an inverse view.
	pub fn inverse(op: &'static str, scalars: impl IntoIterator<Item = Scalar>) -> Self {
		Self {
			op,
			operands: SmallVec::from_slice(&[ScatterOperand::Update]),
			scalars: scalars.into_iter().collect(),
		}
	}
}

/// Ordered registered operations that write an updated view back into its base.
///
/// The final step's result has the base's shape and equals the base everywhere
/// except the region the view covered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScatterPlan {
	steps: SmallVec<[ScatterStep; 1]>,
}

impl ScatterPlan {
	pub fn new() -> Self {
		Self::default()
	}

	/// Plan consisting of a single step.
	pub fn single(step: ScatterStep) -> Self {
		let mut plan = Self::new();
		plan.push(step);
		plan
	}

	pub fn push(&mut self, step: ScatterStep) {
		self.steps.push(step);
	}

	/// Appends a step, builder style.
	pub fn then(mut self, step: ScatterStep) -> Self {
		self.push(step);
		self
	}

	pub fn steps(&self) -> &[ScatterStep] {
		&self.steps
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}
}
