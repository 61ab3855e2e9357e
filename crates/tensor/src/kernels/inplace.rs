use purify_registry::{KernelError, KernelResult, Outputs, Scalar};

use super::pointwise::{self, broadcast_values};
use super::view::{squeeze_layout, transpose_layout, unsqueeze_layout};
use super::{float, tensor};
use crate::Tensor;

/// Writes `values` (already shaped like `dst`) into `dst` and hands `dst` back.
fn assign(dst: &Tensor, values: &[f32]) -> KernelResult<Outputs<Tensor>> {
	dst.write(values);
	Ok(Outputs::Single(dst.clone()))
}

/// Runs the pure kernel and writes its result into the first operand.
///
/// The result must keep the destination's shape; in-place ops never broadcast
/// their destination.
fn update(
	op: &'static str,
	tensors: &[Tensor],
	scalars: &[Scalar],
	pure: fn(&[Tensor], &[Scalar]) -> KernelResult<Outputs<Tensor>>,
) -> KernelResult<Outputs<Tensor>> {
	let dst = tensor(op, tensors, 0)?;
	let result = pure(tensors, scalars)?
		.single()
		.ok_or_else(|| KernelError::invalid(op, "functional form produced several results"))?;
	if result.shape() != dst.shape() {
		return Err(KernelError::ShapeMismatch {
			op,
			left: dst.shape(),
			right: result.shape(),
		});
	}
	assign(dst, &result.to_vec())
}

pub(crate) fn add_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	update("add_", tensors, scalars, pointwise::add)
}

pub(crate) fn sub_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	update("sub_", tensors, scalars, pointwise::sub)
}

pub(crate) fn mul_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	update("mul_", tensors, scalars, pointwise::mul)
}

pub(crate) fn fill_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let dst = tensor("fill_", tensors, 0)?;
	let value = float("fill_", scalars, 0)?;
	assign(dst, &vec![value; dst.numel()])
}

pub(crate) fn zero_(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let dst = tensor("zero_", tensors, 0)?;
	assign(dst, &vec![0.0; dst.numel()])
}

/// `copy_(dst, src)`: broadcasts `src` to `dst`'s shape and overwrites `dst`.
pub(crate) fn copy_(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let dst = tensor("copy_", tensors, 0)?;
	let src = tensor("copy_", tensors, 1)?;
	let values = broadcast_values("copy_", src, &dst.shape())?;
	assign(dst, &values)
}

pub(crate) fn transpose_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("transpose_", tensors, 0)?;
	t.set_layout(transpose_layout("transpose_", t, scalars)?);
	Ok(Outputs::Single(t.clone()))
}

pub(crate) fn unsqueeze_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("unsqueeze_", tensors, 0)?;
	t.set_layout(unsqueeze_layout("unsqueeze_", t, scalars)?);
	Ok(Outputs::Single(t.clone()))
}

pub(crate) fn squeeze_(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("squeeze_", tensors, 0)?;
	t.set_layout(squeeze_layout("squeeze_", t, scalars)?);
	Ok(Outputs::Single(t.clone()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_add_in_place_through_view() {
		let base = Tensor::zeros(&[2, 2]);
		let diag = base.with_layout(base.layout().diagonal());
		let out = add_(&[diag.clone(), Tensor::ones(&[2])], &[]).unwrap().single().unwrap();
		assert!(out.same_object(&diag));
		assert_eq!(base.to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
	}

	#[test]
	fn test_in_place_refuses_to_grow_destination() {
		let err = add_(&[Tensor::ones(&[2]), Tensor::ones(&[3, 2])], &[]).unwrap_err();
		assert!(matches!(err, KernelError::ShapeMismatch { op: "add_", .. }));
	}

	#[test]
	fn test_self_aliasing_mul() {
		let t = Tensor::arange(&[3]);
		mul_(&[t.clone(), t.clone()], &[]).unwrap();
		assert_eq!(t.to_vec(), vec![0.0, 1.0, 4.0]);
	}

	#[test]
	fn test_copy_broadcasts_source() {
		let dst = Tensor::zeros(&[2, 2]);
		copy_(&[dst.clone(), Tensor::arange(&[2])], &[]).unwrap();
		assert_eq!(dst.to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
	}

	#[test]
	fn test_transpose_in_place_keeps_identity() {
		let t = Tensor::arange(&[2, 3]);
		let id = t.id();
		let out = transpose_(&[t.clone()], &[Scalar::Int(0), Scalar::Int(1)])
			.unwrap()
			.single()
			.unwrap();
		assert_eq!(out.id(), id);
		assert_eq!(t.shape(), vec![3, 2]);
	}

	#[test]
	fn test_fill_and_zero() {
		let t = Tensor::arange(&[2]);
		fill_(&[t.clone()], &[Scalar::Float(2.5)]).unwrap();
		assert_eq!(t.to_vec(), vec![2.5, 2.5]);
		zero_(&[t.clone()], &[]).unwrap();
		assert_eq!(t.to_vec(), vec![0.0, 0.0]);
	}
}
