//! Reference kernels.
//!
//! Every kernel follows the registry calling convention: tensor operands first,
//! scalars second, one or more results. View kernels return new objects over
//! their input's storage; pure and scatter kernels return fresh storage;
//! in-place kernels write into (or relayout) their first operand and return it.

pub(crate) mod inplace;
pub(crate) mod pointwise;
pub(crate) mod scatter;
pub(crate) mod view;

use purify_registry::{KernelError, KernelResult, Scalar};

use crate::Tensor;

pub(crate) fn tensor<'a>(op: &'static str, tensors: &'a [Tensor], idx: usize) -> KernelResult<&'a Tensor> {
	tensors
		.get(idx)
		.ok_or_else(|| KernelError::invalid(op, format!("missing tensor operand {idx}")))
}

pub(crate) fn int(op: &'static str, scalars: &[Scalar], idx: usize) -> KernelResult<i64> {
	scalars
		.get(idx)
		.and_then(Scalar::as_int)
		.ok_or_else(|| KernelError::invalid(op, format!("scalar {idx} must be an integer")))
}

pub(crate) fn opt_int(op: &'static str, scalars: &[Scalar], idx: usize) -> KernelResult<Option<i64>> {
	match scalars.get(idx) {
		None => Ok(None),
		Some(_) => int(op, scalars, idx).map(Some),
	}
}

pub(crate) fn ints<'a>(op: &'static str, scalars: &'a [Scalar], idx: usize) -> KernelResult<&'a [i64]> {
	scalars
		.get(idx)
		.and_then(Scalar::as_ints)
		.ok_or_else(|| KernelError::invalid(op, format!("scalar {idx} must be an integer list")))
}

pub(crate) fn float(op: &'static str, scalars: &[Scalar], idx: usize) -> KernelResult<f32> {
	scalars
		.get(idx)
		.and_then(Scalar::as_float)
		.map(|v| v as f32)
		.ok_or_else(|| KernelError::invalid(op, format!("scalar {idx} must be a number")))
}

/// Wraps a possibly negative dim into `0..ndim`.
pub(crate) fn wrap_dim(op: &'static str, dim: i64, ndim: usize) -> KernelResult<usize> {
	let n = ndim as i64;
	let wrapped = if dim < 0 { dim + n } else { dim };
	if (0..n).contains(&wrapped) {
		Ok(wrapped as usize)
	} else {
		Err(KernelError::IndexOutOfRange {
			op,
			index: dim,
			size: ndim,
		})
	}
}

/// Resolves a shape argument, inferring at most one `-1` entry.
pub(crate) fn resolve_shape(op: &'static str, requested: &[i64], numel: usize) -> KernelResult<Vec<usize>> {
	let mut inferred = None;
	let mut known = 1usize;
	for (i, &size) in requested.iter().enumerate() {
		match size {
			-1 if inferred.is_none() => inferred = Some(i),
			s if s >= 0 => known *= s as usize,
			_ => return Err(KernelError::invalid(op, format!("invalid shape {requested:?}"))),
		}
	}
	let mut shape: Vec<usize> = requested.iter().map(|&s| s.max(0) as usize).collect();
	if let Some(i) = inferred {
		if known == 0 || numel % known != 0 {
			return Err(KernelError::invalid(op, format!("shape {requested:?} is invalid for {numel} elements")));
		}
		shape[i] = numel / known;
	}
	Ok(shape)
}
