use purify_registry::{KernelError, KernelResult, Outputs, Scalar};

use super::{int, ints, opt_int, resolve_shape, tensor, wrap_dim};
use crate::Tensor;
use crate::layout::Layout;

fn single(t: Tensor) -> KernelResult<Outputs<Tensor>> {
	Ok(Outputs::Single(t))
}

pub(crate) fn view_layout(op: &'static str, t: &Tensor, requested: &[i64]) -> KernelResult<Layout> {
	let layout = t.layout().clone();
	let shape = resolve_shape(op, requested, layout.numel())?;
	layout.view(&shape).ok_or_else(|| KernelError::NotViewable {
		op,
		shape: layout.shape.to_vec(),
		strides: layout.strides.to_vec(),
		requested: shape,
	})
}

pub(crate) fn view(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("view", tensors, 0)?;
	let layout = view_layout("view", t, ints("view", scalars, 0)?)?;
	single(t.with_layout(layout))
}

/// Same as `view`; kept as a distinct symbol so traces show what was asked for.
pub(crate) fn reshape(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("reshape", tensors, 0)?;
	let layout = view_layout("reshape", t, ints("reshape", scalars, 0)?)?;
	single(t.with_layout(layout))
}

pub(crate) fn transpose_layout(op: &'static str, t: &Tensor, scalars: &[Scalar]) -> KernelResult<Layout> {
	let ndim = t.ndim();
	let d0 = wrap_dim(op, int(op, scalars, 0)?, ndim)?;
	let d1 = wrap_dim(op, int(op, scalars, 1)?, ndim)?;
	Ok(t.layout().transpose(d0, d1))
}

pub(crate) fn transpose(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("transpose", tensors, 0)?;
	single(t.with_layout(transpose_layout("transpose", t, scalars)?))
}

pub(crate) fn diagonal_layout(op: &'static str, t: &Tensor) -> KernelResult<Layout> {
	if t.ndim() != 2 {
		return Err(KernelError::invalid(op, format!("expected a 2-D input, got shape {:?}", t.shape())));
	}
	Ok(t.layout().diagonal())
}

pub(crate) fn diagonal(tensors: &[Tensor], _: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("diagonal", tensors, 0)?;
	single(t.with_layout(diagonal_layout("diagonal", t)?))
}

pub(crate) fn select_layout(op: &'static str, t: &Tensor, scalars: &[Scalar]) -> KernelResult<Layout> {
	let layout = t.layout().clone();
	let dim = wrap_dim(op, int(op, scalars, 0)?, layout.ndim())?;
	let index = int(op, scalars, 1)?;
	let size = layout.shape[dim];
	let wrapped = if index < 0 { index + size as i64 } else { index };
	if !(0..size as i64).contains(&wrapped) {
		return Err(KernelError::IndexOutOfRange { op, index, size });
	}
	Ok(layout.select(dim, wrapped as usize))
}

pub(crate) fn select(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("select", tensors, 0)?;
	single(t.with_layout(select_layout("select", t, scalars)?))
}

/// `slice(dim, start, end)` with python-style clamping of out-of-range bounds.
pub(crate) fn slice_layout(op: &'static str, t: &Tensor, scalars: &[Scalar]) -> KernelResult<Layout> {
	let layout = t.layout().clone();
	let dim = wrap_dim(op, int(op, scalars, 0)?, layout.ndim())?;
	let size = layout.shape[dim] as i64;
	let clamp = |v: i64| {
		let v = if v < 0 { v + size } else { v };
		v.clamp(0, size)
	};
	let start = clamp(opt_int(op, scalars, 1)?.unwrap_or(0));
	let end = clamp(opt_int(op, scalars, 2)?.unwrap_or(size)).max(start);
	Ok(layout.narrow(dim, start as usize, (end - start) as usize))
}

pub(crate) fn slice(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("slice", tensors, 0)?;
	single(t.with_layout(slice_layout("slice", t, scalars)?))
}

/// Bounds of every chunk `split(size, dim)` produces.
pub(crate) fn split_bounds(op: &'static str, shape: &[usize], scalars: &[Scalar]) -> KernelResult<(usize, Vec<(usize, usize)>)> {
	let size = int(op, scalars, 0)?;
	if size <= 0 {
		return Err(KernelError::invalid(op, format!("split size must be positive, got {size}")));
	}
	let dim = wrap_dim(op, opt_int(op, scalars, 1)?.unwrap_or(0), shape.len())?;
	let len = shape[dim];
	let size = size as usize;
	let chunks = len.div_ceil(size).max(1);
	let bounds = (0..chunks)
		.map(|i| (i * size, ((i + 1) * size).min(len)))
		.collect();
	Ok((dim, bounds))
}

pub(crate) fn split(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("split", tensors, 0)?;
	let layout = t.layout().clone();
	let (dim, bounds) = split_bounds("split", &layout.shape, scalars)?;
	let parts = bounds
		.into_iter()
		.map(|(start, end)| t.with_layout(layout.narrow(dim, start, end - start)))
		.collect();
	Ok(Outputs::Multi(parts))
}

pub(crate) fn unsqueeze_layout(op: &'static str, t: &Tensor, scalars: &[Scalar]) -> KernelResult<Layout> {
	let layout = t.layout().clone();
	let dim = wrap_dim(op, int(op, scalars, 0)?, layout.ndim() + 1)?;
	Ok(layout.unsqueeze(dim))
}

pub(crate) fn unsqueeze(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("unsqueeze", tensors, 0)?;
	single(t.with_layout(unsqueeze_layout("unsqueeze", t, scalars)?))
}

pub(crate) fn squeeze_layout(op: &'static str, t: &Tensor, scalars: &[Scalar]) -> KernelResult<Layout> {
	let layout = t.layout().clone();
	let dim = opt_int(op, scalars, 0)?
		.map(|d| wrap_dim(op, d, layout.ndim()))
		.transpose()?;
	Ok(layout.squeeze(dim))
}

pub(crate) fn squeeze(tensors: &[Tensor], scalars: &[Scalar]) -> KernelResult<Outputs<Tensor>> {
	let t = tensor("squeeze", tensors, 0)?;
	single(t.with_layout(squeeze_layout("squeeze", t, scalars)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn one(out: KernelResult<Outputs<Tensor>>) -> Tensor {
		out.unwrap().single().unwrap()
	}

	#[test]
	fn test_views_share_storage() {
		let base = Tensor::arange(&[4, 2]);
		for t in [
			one(view(&[base.clone()], &[Scalar::ints([8])])),
			one(transpose(&[base.clone()], &[Scalar::Int(1), Scalar::Int(0)])),
			one(select(&[base.clone()], &[Scalar::Int(0), Scalar::Int(-1)])),
			one(slice(&[base.clone()], &[Scalar::Int(0), Scalar::Int(1), Scalar::Int(3)])),
			one(unsqueeze(&[base.clone()], &[Scalar::Int(0)])),
		] {
			assert!(t.shares_storage(&base));
		}
	}

	#[test]
	fn test_select_negative_index() {
		let base = Tensor::arange(&[4, 2]);
		let last = one(select(&[base], &[Scalar::Int(0), Scalar::Int(-1)]));
		assert_eq!(last.to_vec(), vec![6.0, 7.0]);
	}

	#[test]
	fn test_split_uneven_tail() {
		let base = Tensor::arange(&[5, 2]);
		let parts = split(&[base], &[Scalar::Int(2)]).unwrap().into_vec();
		let shapes: Vec<_> = parts.iter().map(Tensor::shape).collect();
		assert_eq!(shapes, vec![vec![2, 2], vec![2, 2], vec![1, 2]]);
		assert_eq!(parts[2].to_vec(), vec![8.0, 9.0]);
	}

	#[test]
	fn test_view_of_non_viewable_fails() {
		let base = Tensor::arange(&[2, 4]);
		let t = one(transpose(&[base], &[Scalar::Int(0), Scalar::Int(1)]));
		let err = view(&[t], &[Scalar::ints([8])]).unwrap_err();
		assert!(matches!(err, KernelError::NotViewable { .. }));
	}

	#[test]
	fn test_slice_clamps() {
		let base = Tensor::arange(&[4]);
		let t = one(slice(&[base], &[Scalar::Int(0), Scalar::Int(2), Scalar::Int(100)]));
		assert_eq!(t.to_vec(), vec![2.0, 3.0]);
	}

	#[test]
	fn test_squeeze_all_and_one() {
		let base = Tensor::arange(&[1, 3, 1]);
		assert_eq!(one(squeeze(&[base.clone()], &[])).shape(), vec![3]);
		assert_eq!(one(squeeze(&[base], &[Scalar::Int(-1)])).shape(), vec![1, 3]);
	}
}
