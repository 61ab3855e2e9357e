use crate::error::{KernelError, RegistryError};
use crate::index::OpRegistry;
use crate::value::{Outputs, RawValue, Scalar};

/// Capability every operation site routes through.
///
/// User programs are written against this trait so the same code runs
/// directly ([`Eager`]) or under a functionalizing implementation.
pub trait Dispatch<V: RawValue> {
	/// The value handle user code holds.
	type Value: Clone;
	type Error: From<KernelError>;

	/// Lifts a raw value the program created itself (e.g. `ones(4, 2)`).
	fn constant(&mut self, raw: V) -> Self::Value;

	/// Current shape of a value.
	fn shape(&self, value: &Self::Value) -> Vec<usize>;

	/// Issues `op(tensors.., scalars..)`.
	fn call(
		&mut self,
		op: &str,
		tensors: &[Self::Value],
		scalars: &[Scalar],
	) -> Result<Outputs<Self::Value>, Self::Error>;

	/// Issues a single-output operation.
	fn call_single(
		&mut self,
		op: &str,
		tensors: &[Self::Value],
		scalars: &[Scalar],
	) -> Result<Self::Value, Self::Error> {
		let out = self.call(op, tensors, scalars)?;
		let actual = out.len();
		out.single().ok_or_else(|| {
			KernelError::Arity {
				op: op.to_string(),
				expected: "single".to_string(),
				actual,
			}
			.into()
		})
	}
}

/// Direct execution: every op runs its own kernel against raw values.
///
/// Mutating kernels mutate, view kernels alias. Nothing is recorded.
pub struct Eager<'r, V> {
	registry: &'r OpRegistry<V>,
}

impl<'r, V> Eager<'r, V> {
	pub fn new(registry: &'r OpRegistry<V>) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &'r OpRegistry<V> {
		self.registry
	}
}

impl<V: RawValue> Dispatch<V> for Eager<'_, V> {
	type Value = V;
	type Error = RegistryError;

	fn constant(&mut self, raw: V) -> V {
		raw
	}

	fn shape(&self, value: &V) -> Vec<usize> {
		value.shape()
	}

	fn call(
		&mut self,
		op: &str,
		tensors: &[V],
		scalars: &[Scalar],
	) -> Result<Outputs<V>, RegistryError> {
		tracing::trace!(op, tensors = tensors.len(), "eager.call");
		self.registry.run(op, tensors, scalars)
	}
}
