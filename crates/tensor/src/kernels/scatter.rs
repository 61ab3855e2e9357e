//! Out-of-place inverses of the view kernels.
//!
//! `op_scatter(base, src, view args..)` returns a fresh copy of `base` whose
//! region `op(base, view args..)` holds `src`.

use purify_registry::{KernelError, KernelResult, Outputs, Scalar};

use super::view::{diagonal_layout, select_layout, slice_layout};
use super::tensor;
use crate::Tensor;
use crate::layout::Layout;

fn embed(op: &'static str, tensors: &[Tensor], region: impl FnOnce(&Tensor) -> KernelResult<Layout>) -> KernelResult<Outputs<Tensor>> {
	let base = tensor(op, tensors, 0)?;
	let src = tensor(op, tensors, 1)?;
	let out = base.contiguous_copy();
	let window = out.with_layout(region(&out)?);
	let (want, got) = (window.shape(), src.shape());
	if want != got {
		return Err(KernelError::ShapeMismatch {
			op,
			left: want,
			right: got,
		});
	}
	window.write(&src.to_vec());
	Ok(Outputs::Single(out))
}

pub(crate) fn diagonal_scatter(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	embed("diagonal_scatter", tensors, |t| diagonal_layout("diagonal_scatter", t))
}

pub(crate) fn select_scatter(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	embed("select_scatter", tensors, |t| select_layout("select_scatter", t, scalars))
}

pub(crate) fn slice_scatter(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	embed("slice_scatter", tensors, |t| slice_layout("slice_scatter", t, scalars))
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn test_diagonal_scatter_leaves_base_untouched() {
		let base = Tensor::zeros(&[2, 2]);
		let src = Tensor::ones(&[2]);
		let out = diagonal_scatter(&[base.clone(), src], &[]).unwrap().single().unwrap();
		assert_eq!(out.to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
		assert_eq!(base.to_vec(), vec![0.0; 4]);
		assert!(!out.shares_storage(&base));
	}

	#[test]
	fn test_slice_scatter_writes_rows() {
		let base = Tensor::zeros(&[4, 2]);
		let src = Tensor::ones(&[2, 2]);
		let args = [Scalar::Int(0), Scalar::Int(2), Scalar::Int(4)];
		let out = slice_scatter(&[base, src], &args).unwrap().single().unwrap();
		assert_eq!(out.to_vec(), vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
	}

	#[test]
	fn test_select_scatter_column() {
		let base = Tensor::zeros(&[2, 3]);
		let src = Tensor::full(&[2], 5.0);
		let out = select_scatter(&[base, src], &[Scalar::Int(1), Scalar::Int(1)])
			.unwrap()
			.single()
			.unwrap();
		assert_eq!(out.to_vec(), vec![0.0, 5.0, 0.0, 0.0, 5.0, 0.0]);
	}

	#[test]
	fn test_scatter_rejects_wrong_region_shape() {
		let err = diagonal_scatter(&[Tensor::zeros(&[3, 3]), Tensor::ones(&[2])], &[]).unwrap_err();
		assert!(matches!(err, KernelError::ShapeMismatch { op: "diagonal_scatter", .. }));
	}
}
