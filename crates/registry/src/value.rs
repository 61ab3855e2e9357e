use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::error::{KernelError, KernelResult};

/// Process-unique identity of a raw value object.
///
/// Two handles to the same object report the same id; a kernel that produces a
/// new object (including a new view over old storage) allocates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(u64);

static NEXT_VALUE_ID: AtomicU64 = AtomicU64::new(0);

impl ValueId {
	/// Allocates a fresh identity.
	pub fn next() -> Self {
		Self(NEXT_VALUE_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw counter value.
	pub const fn get(self) -> u64 {
		self.0
	}
}

/// An opaque multi-dimensional value as seen by the engine.
///
/// Everything numeric about the value is the registry's business; the engine
/// only needs identity (for tracing) and shape (to expand copy sources).
pub trait RawValue: Clone + 'static {
	fn id(&self) -> ValueId;

	fn shape(&self) -> Vec<usize>;
}

/// A non-array operation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Int(i64),
	Ints(SmallVec<[i64; 4]>),
	Float(f64),
	Bool(bool),
}

impl Scalar {
	/// Builds an [`Scalar::Ints`] from integers that widen losslessly.
	pub fn ints<I>(values: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<i64>,
	{
		Self::Ints(values.into_iter().map(Into::into).collect())
	}

	/// Builds an [`Scalar::Ints`] from a shape, for op `op`.
	///
	/// A dimension past `i64::MAX` is an invalid argument rather than being
	/// dropped, so the result always has one entry per dimension.
	pub fn dims(op: &'static str, shape: &[usize]) -> KernelResult<Self> {
		shape
			.iter()
			.map(|&dim| {
				i64::try_from(dim)
					.map_err(|_| KernelError::invalid(op, format!("dimension {dim} does not fit in i64")))
			})
			.collect::<KernelResult<_>>()
			.map(Self::Ints)
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_ints(&self) -> Option<&[i64]> {
		match self {
			Self::Ints(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			Self::Int(v) => Some(*v as f64),
			_ => None,
		}
	}
}

impl From<i64> for Scalar {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<f64> for Scalar {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<bool> for Scalar {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<&[i64]> for Scalar {
	fn from(v: &[i64]) -> Self {
		Self::Ints(v.into())
	}
}

impl fmt::Display for Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(v) => write!(f, "{v}"),
			Self::Ints(v) => {
				f.write_str("[")?;
				for (i, x) in v.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{x}")?;
				}
				f.write_str("]")
			}
			Self::Float(v) => write!(f, "{v:?}"),
			Self::Bool(v) => write!(f, "{v}"),
		}
	}
}

/// Number of results an operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
	/// Exactly one result.
	Single,
	/// An ordered sequence of results whose length depends on the arguments.
	Multi,
}

impl fmt::Display for Arity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Single => f.write_str("single"),
			Self::Multi => f.write_str("multi"),
		}
	}
}

/// Results of one operation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outputs<T> {
	Single(T),
	Multi(Vec<T>),
}

impl<T> Outputs<T> {
	pub fn len(&self) -> usize {
		match self {
			Self::Single(_) => 1,
			Self::Multi(v) => v.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Multi(v) if v.is_empty())
	}

	pub fn arity(&self) -> Arity {
		match self {
			Self::Single(_) => Arity::Single,
			Self::Multi(_) => Arity::Multi,
		}
	}

	/// Returns the single result, or `None` for a multi-output call.
	pub fn single(self) -> Option<T> {
		match self {
			Self::Single(v) => Some(v),
			Self::Multi(_) => None,
		}
	}

	pub fn into_vec(self) -> Vec<T> {
		match self {
			Self::Single(v) => vec![v],
			Self::Multi(v) => v,
		}
	}

	pub fn as_slice(&self) -> &[T] {
		match self {
			Self::Single(v) => std::slice::from_ref(v),
			Self::Multi(v) => v,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> {
		self.as_slice().iter()
	}

	pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Outputs<U> {
		match self {
			Self::Single(v) => Outputs::Single(f(v)),
			Self::Multi(v) => Outputs::Multi(v.into_iter().map(f).collect()),
		}
	}

	pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<Outputs<U>, E> {
		Ok(match self {
			Self::Single(v) => Outputs::Single(f(v)?),
			Self::Multi(v) => Outputs::Multi(v.into_iter().map(f).collect::<Result<_, _>>()?),
		})
	}
}

#[cfg(test)]
mod tests {
	use smallvec::smallvec;

	use super::*;

	#[test]
	fn test_scalar_display() {
		assert_eq!(Scalar::Ints(smallvec![4, 2]).to_string(), "[4, 2]");
		assert_eq!(Scalar::Int(0).to_string(), "0");
		assert_eq!(Scalar::Float(1.0).to_string(), "1.0");
		assert_eq!(Scalar::ints([8]).to_string(), "[8]");
	}

	#[test]
	fn test_dims_keep_every_dimension() {
		assert_eq!(Scalar::dims("view", &[4, 2]), Ok(Scalar::Ints(smallvec![4, 2])));
		assert_eq!(Scalar::dims("view", &[]), Ok(Scalar::Ints(SmallVec::new())));
	}

	#[test]
	#[cfg(target_pointer_width = "64")]
	fn test_dims_reject_oversized_dimension() {
		let err = Scalar::dims("expand", &[2, usize::MAX]).unwrap_err();
		assert!(matches!(err, KernelError::InvalidArgument { op: "expand", .. }));
	}

	#[test]
	fn test_outputs_iter_and_map() {
		let multi = Outputs::Multi(vec![1, 2, 3]);
		assert_eq!(multi.iter().copied().sum::<i32>(), 6);
		assert_eq!(multi.map(|v| v * 2).into_vec(), vec![2, 4, 6]);

		let single = Outputs::Single(7);
		assert_eq!(single.len(), 1);
		assert_eq!(single.arity(), Arity::Single);
		assert_eq!(single.single(), Some(7));
	}

	#[test]
	fn test_value_ids_are_unique() {
		let a = ValueId::next();
		let b = ValueId::next();
		assert_ne!(a, b);
		assert!(b.get() > a.get());
	}
}
