use purify_registry::{Dispatch, Scalar};

use crate::Tensor;

type OpResult<D> = Result<<D as Dispatch<Tensor>>::Value, <D as Dispatch<Tensor>>::Error>;

/// Method-style access to every builtin op through any [`Dispatch`].
///
/// User programs are written once against this trait and run unchanged under
/// direct execution and under functionalization.
pub trait TensorOps: Dispatch<Tensor> + Sized {
	fn add(&mut self, a: &Self::Value, b: &Self::Value) -> OpResult<Self> {
		self.call_single("add", &[a.clone(), b.clone()], &[])
	}

	fn sub(&mut self, a: &Self::Value, b: &Self::Value) -> OpResult<Self> {
		self.call_single("sub", &[a.clone(), b.clone()], &[])
	}

	fn mul(&mut self, a: &Self::Value, b: &Self::Value) -> OpResult<Self> {
		self.call_single("mul", &[a.clone(), b.clone()], &[])
	}

	fn add_scalar(&mut self, a: &Self::Value, rhs: f64) -> OpResult<Self> {
		self.call_single("add", std::slice::from_ref(a), &[Scalar::Float(rhs)])
	}

	fn mul_scalar(&mut self, a: &Self::Value, rhs: f64) -> OpResult<Self> {
		self.call_single("mul", std::slice::from_ref(a), &[Scalar::Float(rhs)])
	}

	fn neg(&mut self, a: &Self::Value) -> OpResult<Self> {
		self.call_single("neg", std::slice::from_ref(a), &[])
	}

	/// `clone` op; named apart from [`Clone::clone`].
	fn clone_tensor(&mut self, a: &Self::Value) -> OpResult<Self> {
		self.call_single("clone", std::slice::from_ref(a), &[])
	}

	fn expand(&mut self, a: &Self::Value, shape: &[i64]) -> OpResult<Self> {
		self.call_single("expand", std::slice::from_ref(a), &[Scalar::from(shape)])
	}

	fn full_like(&mut self, a: &Self::Value, value: f64) -> OpResult<Self> {
		self.call_single("full_like", std::slice::from_ref(a), &[Scalar::Float(value)])
	}

	fn zeros_like(&mut self, a: &Self::Value) -> OpResult<Self> {
		self.call_single("zeros_like", std::slice::from_ref(a), &[])
	}

	fn view(&mut self, a: &Self::Value, shape: &[i64]) -> OpResult<Self> {
		self.call_single("view", std::slice::from_ref(a), &[Scalar::from(shape)])
	}

	fn reshape(&mut self, a: &Self::Value, shape: &[i64]) -> OpResult<Self> {
		self.call_single("reshape", std::slice::from_ref(a), &[Scalar::from(shape)])
	}

	fn transpose(&mut self, a: &Self::Value, d0: i64, d1: i64) -> OpResult<Self> {
		self.call_single("transpose", std::slice::from_ref(a), &[Scalar::Int(d0), Scalar::Int(d1)])
	}

	fn diagonal(&mut self, a: &Self::Value) -> OpResult<Self> {
		self.call_single("diagonal", std::slice::from_ref(a), &[])
	}

	fn select(&mut self, a: &Self::Value, dim: i64, index: i64) -> OpResult<Self> {
		self.call_single("select", std::slice::from_ref(a), &[Scalar::Int(dim), Scalar::Int(index)])
	}

	fn slice(&mut self, a: &Self::Value, dim: i64, start: i64, end: i64) -> OpResult<Self> {
		let scalars = [Scalar::Int(dim), Scalar::Int(start), Scalar::Int(end)];
		self.call_single("slice", std::slice::from_ref(a), &scalars)
	}

	/// Chunks of `size` along dim 0.
	fn split(&mut self, a: &Self::Value, size: i64) -> Result<Vec<Self::Value>, Self::Error> {
		Ok(self.call("split", std::slice::from_ref(a), &[Scalar::Int(size)])?.into_vec())
	}

	fn split_dim(&mut self, a: &Self::Value, size: i64, dim: i64) -> Result<Vec<Self::Value>, Self::Error> {
		let scalars = [Scalar::Int(size), Scalar::Int(dim)];
		Ok(self.call("split", std::slice::from_ref(a), &scalars)?.into_vec())
	}

	fn unsqueeze(&mut self, a: &Self::Value, dim: i64) -> OpResult<Self> {
		self.call_single("unsqueeze", std::slice::from_ref(a), &[Scalar::Int(dim)])
	}

	/// Drops every size-1 dim.
	fn squeeze(&mut self, a: &Self::Value) -> OpResult<Self> {
		self.call_single("squeeze", std::slice::from_ref(a), &[])
	}

	fn squeeze_dim(&mut self, a: &Self::Value, dim: i64) -> OpResult<Self> {
		self.call_single("squeeze", std::slice::from_ref(a), &[Scalar::Int(dim)])
	}

	fn add_(&mut self, dst: &Self::Value, other: &Self::Value) -> OpResult<Self> {
		self.call_single("add_", &[dst.clone(), other.clone()], &[])
	}

	fn sub_(&mut self, dst: &Self::Value, other: &Self::Value) -> OpResult<Self> {
		self.call_single("sub_", &[dst.clone(), other.clone()], &[])
	}

	fn mul_(&mut self, dst: &Self::Value, other: &Self::Value) -> OpResult<Self> {
		self.call_single("mul_", &[dst.clone(), other.clone()], &[])
	}

	fn add_scalar_(&mut self, dst: &Self::Value, rhs: f64) -> OpResult<Self> {
		self.call_single("add_", std::slice::from_ref(dst), &[Scalar::Float(rhs)])
	}

	fn fill_(&mut self, dst: &Self::Value, value: f64) -> OpResult<Self> {
		self.call_single("fill_", std::slice::from_ref(dst), &[Scalar::Float(value)])
	}

	fn zero_(&mut self, dst: &Self::Value) -> OpResult<Self> {
		self.call_single("zero_", std::slice::from_ref(dst), &[])
	}

	fn copy_(&mut self, dst: &Self::Value, src: &Self::Value) -> OpResult<Self> {
		self.call_single("copy_", &[dst.clone(), src.clone()], &[])
	}

	fn transpose_(&mut self, a: &Self::Value, d0: i64, d1: i64) -> OpResult<Self> {
		self.call_single("transpose_", std::slice::from_ref(a), &[Scalar::Int(d0), Scalar::Int(d1)])
	}

	fn unsqueeze_(&mut self, a: &Self::Value, dim: i64) -> OpResult<Self> {
		self.call_single("unsqueeze_", std::slice::from_ref(a), &[Scalar::Int(dim)])
	}

	fn squeeze_(&mut self, a: &Self::Value) -> OpResult<Self> {
		self.call_single("squeeze_", std::slice::from_ref(a), &[])
	}
}

impl<D: Dispatch<Tensor>> TensorOps for D {}

#[cfg(test)]
mod tests {
	use purify_registry::Eager;

	use super::*;
	use crate::builtin_registry;

	#[test]
	fn test_eager_program_aliases_like_torch() {
		let registry = builtin_registry().unwrap();
		let mut d = Eager::new(&registry);
		let x = Tensor::ones(&[4, 2]);
		let y = d.view(&x, &[4, 2]).unwrap();
		let tmp = Tensor::ones(&[4, 2]);
		d.add_(&y, &tmp).unwrap();
		let z = d.mul(&x, &x).unwrap();
		assert_eq!(x.to_vec(), vec![2.0; 8]);
		assert_eq!(z.to_vec(), vec![4.0; 8]);
		assert!(y.shares_storage(&x));
	}

	#[test]
	fn test_eager_view_inplace_rebinds_metadata() {
		let registry = builtin_registry().unwrap();
		let mut d = Eager::new(&registry);
		let x = Tensor::ones(&[4, 2]);
		d.transpose_(&x, 1, 0).unwrap();
		let row = d.select(&x, 0, 0).unwrap();
		d.add_(&row, &Tensor::ones(&[4])).unwrap();
		assert_eq!(x.shape(), vec![2, 4]);
		assert_eq!(x.to_vec(), vec![2.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0]);
	}
}
