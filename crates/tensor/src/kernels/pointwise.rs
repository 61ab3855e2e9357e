use purify_registry::{KernelError, KernelResult, Outputs, Scalar};

use super::{float, ints, tensor};
use crate::Tensor;
use crate::layout::broadcast_shapes;

/// Elementwise `f(a, b)` over the broadcast shape, into fresh storage.
pub(crate) fn binary(op: &'static str, a: &Tensor, b: &Tensor, f: impl Fn(f32, f32) -> f32) -> KernelResult<Tensor> {
	let (sa, sb) = (a.shape(), b.shape());
	let shape = broadcast_shapes(&sa, &sb).ok_or_else(|| KernelError::ShapeMismatch {
		op,
		left: sa.clone(),
		right: sb.clone(),
	})?;
	let xs = broadcast_values(op, a, &shape)?;
	let ys = broadcast_values(op, b, &shape)?;
	let data = xs.into_iter().zip(ys).map(|(x, y)| f(x, y)).collect();
	Ok(Tensor::fresh(&shape, data))
}

/// Values of `t` broadcast to `shape`, row-major.
pub(crate) fn broadcast_values(op: &'static str, t: &Tensor, shape: &[usize]) -> KernelResult<Vec<f32>> {
	let layout = t.layout().expand(shape).ok_or_else(|| KernelError::ShapeMismatch {
		op,
		left: t.shape(),
		right: shape.to_vec(),
	})?;
	Ok(t.with_layout(layout).to_vec())
}

fn binary_kernel(
	op: &'static str,
	tensors: &[Tensor],
	scalars: &[Scalar],
	f: impl Fn(f32, f32) -> f32,
) -> KernelResult<Outputs<Tensor>> {
	let a = tensor(op, tensors, 0)?;
	let out = match tensors.get(1) {
		Some(b) => binary(op, a, b, f)?,
		None => {
			let rhs = float(op, scalars, 0)?;
			let data = a.to_vec().into_iter().map(|x| f(x, rhs)).collect();
			Tensor::fresh(&a.shape(), data)
		}
	};
	Ok(Outputs::Single(out))
}

pub(crate) fn add(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	binary_kernel("add", tensors, scalars, |x, y| x + y)
}

pub(crate) fn sub(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	binary_kernel("sub", tensors, scalars, |x, y| x - y)
}

pub(crate) fn mul(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	binary_kernel("mul", tensors, scalars, |x, y| x * y)
}

pub(crate) fn neg(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("neg", tensors, 0)?;
	let data = t.to_vec().into_iter().map(|x| -x).collect();
	Ok(Outputs::Single(Tensor::fresh(&t.shape(), data)))
}

pub(crate) fn clone(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	Ok(Outputs::Single(tensor("clone", tensors, 0)?.contiguous_copy()))
}

/// `expand(src, shape)`: a fresh tensor equal to `src` broadcast to `shape`.
pub(crate) fn expand(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let src = tensor("expand", tensors, 0)?;
	let requested = ints("expand", scalars, 0)?;
	let src_shape = src.shape();
	let lead = requested.len().saturating_sub(src_shape.len());
	let shape = requested
		.iter()
		.enumerate()
		.map(|(i, &size)| match size {
			s if s >= 0 => Ok(s as usize),
			// -1 keeps the aligned source dim
			-1 if i >= lead => Ok(src_shape[i - lead]),
			_ => Err(KernelError::invalid("expand", format!("invalid size {size} at dim {i}"))),
		})
		.collect::<KernelResult<Vec<_>>>()?;
	let data = broadcast_values("expand", src, &shape)?;
	Ok(Outputs::Single(Tensor::fresh(&shape, data)))
}

pub(crate) fn full_like(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("full_like", tensors, 0)?;
	let value = float("full_like", scalars, 0)?;
	Ok(Outputs::Single(Tensor::full(&t.shape(), value)))
}

pub(crate) fn zeros_like(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("zeros_like", tensors, 0)?;
	Ok(Outputs::Single(Tensor::zeros(&t.shape())))
}
