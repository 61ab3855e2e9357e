//! Builtin operation table for [`Tensor`].
//!
//! Every view op carries a scatter form built from registered ops, so the write
//! back of a mutated view is itself an ordinary traced call sequence
//! (`diagonal_scatter`, `slice_scatter`, an inverse `view`, ...).

use purify_registry::{
	KernelError, KernelResult, OpDef, OpRegistry, RegistryBuilder, RegistryError, Scalar, ScatterPlan, ScatterStep,
};

use crate::Tensor;
use crate::kernels::{inplace, int, opt_int, pointwise, scatter, view, wrap_dim};

/// Name the builtin registry reports in diagnostics.
pub const REGISTRY_LABEL: &str = "tensor";

/// All builtin definitions, unsorted.
pub fn builtin_defs() -> Vec<OpDef<Tensor>> {
	vec![
		// pure
		OpDef::pure("add", "elementwise sum, broadcasting", pointwise::add),
		OpDef::pure("sub", "elementwise difference, broadcasting", pointwise::sub),
		OpDef::pure("mul", "elementwise product, broadcasting", pointwise::mul),
		OpDef::pure("neg", "elementwise negation", pointwise::neg),
		OpDef::pure("clone", "contiguous copy", pointwise::clone),
		OpDef::pure("expand", "materialized broadcast to a shape", pointwise::expand),
		OpDef::pure("full_like", "constant with the input's shape", pointwise::full_like),
		OpDef::pure("zeros_like", "zeros with the input's shape", pointwise::zeros_like),
		OpDef::pure("diagonal_scatter", "base with its diagonal replaced", scatter::diagonal_scatter),
		OpDef::pure("select_scatter", "base with one index replaced", scatter::select_scatter),
		OpDef::pure("slice_scatter", "base with a slice replaced", scatter::slice_scatter),
		// views
		OpDef::view("view", "reinterpret under a new shape", view::view, view_scatter),
		OpDef::view("reshape", "reinterpret under a new shape", view::reshape, reshape_scatter),
		OpDef::view("transpose", "swap two dims", view::transpose, transpose_scatter),
		OpDef::view("diagonal", "main diagonal of a matrix", view::diagonal, diagonal_scatter),
		OpDef::view("select", "fix one dim at an index", view::select, select_scatter),
		OpDef::view("slice", "restrict one dim to a range", view::slice, slice_scatter),
		OpDef::view("split", "chunks of equal size along a dim", view::split, split_scatter).multi(),
		OpDef::view("unsqueeze", "insert a size-1 dim", view::unsqueeze, unsqueeze_scatter),
		OpDef::view("squeeze", "drop size-1 dims", view::squeeze, squeeze_scatter),
		// mutations
		OpDef::in_place("add_", "in-place add", inplace::add_, "add"),
		OpDef::in_place("sub_", "in-place sub", inplace::sub_, "sub"),
		OpDef::in_place("mul_", "in-place mul", inplace::mul_, "mul"),
		OpDef::in_place("fill_", "overwrite with a constant", inplace::fill_, "full_like"),
		OpDef::in_place("zero_", "overwrite with zeros", inplace::zero_, "zeros_like"),
		OpDef::copy_into("copy_", "assign source into destination", inplace::copy_, "expand"),
		OpDef::in_place_view("transpose_", "in-place transpose", inplace::transpose_, "transpose"),
		OpDef::in_place_view("unsqueeze_", "in-place unsqueeze", inplace::unsqueeze_, "unsqueeze"),
		OpDef::in_place_view("squeeze_", "in-place squeeze", inplace::squeeze_, "squeeze"),
	]
}

/// Builds the builtin registry.
pub fn builtin_registry() -> Result<OpRegistry<Tensor>, RegistryError> {
	let mut builder = RegistryBuilder::new(REGISTRY_LABEL);
	builder.extend(builtin_defs())?;
	Ok(builder.build())
}

fn view_scatter(base: &Tensor, _: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	let shape = Scalar::dims("view", &base.shape())?;
	Ok(ScatterPlan::single(ScatterStep::inverse("view", [shape])))
}

fn reshape_scatter(base: &Tensor, _: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	let shape = Scalar::dims("reshape", &base.shape())?;
	Ok(ScatterPlan::single(ScatterStep::inverse("reshape", [shape])))
}

/// Transposes back, then compacts so an inverse `view` further up the chain
/// always sees a viewable value.
fn transpose_scatter(_: &Tensor, args: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	Ok(ScatterPlan::single(ScatterStep::inverse("transpose", args.iter().cloned()))
		.then(ScatterStep::inverse("clone", [])))
}

fn diagonal_scatter(_: &Tensor, _: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	Ok(ScatterPlan::single(ScatterStep::scatter("diagonal_scatter", [])))
}

fn select_scatter(_: &Tensor, args: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	Ok(ScatterPlan::single(ScatterStep::scatter("select_scatter", args.iter().cloned())))
}

fn slice_scatter(_: &Tensor, args: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	Ok(ScatterPlan::single(ScatterStep::scatter("slice_scatter", args.iter().cloned())))
}

/// Output `i` of `split` is the slice `[i * size, min((i + 1) * size, len))`.
fn split_scatter(base: &Tensor, args: &[Scalar], output: usize) -> KernelResult<ScatterPlan> {
	let (dim, bounds) = view::split_bounds("split", &base.shape(), args)?;
	let (start, end) = bounds.get(output).copied().ok_or(KernelError::IndexOutOfRange {
		op: "split",
		index: output as i64,
		size: bounds.len(),
	})?;
	Ok(ScatterPlan::single(ScatterStep::scatter(
		"slice_scatter",
		[Scalar::Int(dim as i64), Scalar::Int(start as i64), Scalar::Int(end as i64)],
	)))
}

fn unsqueeze_scatter(base: &Tensor, args: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	let dim = wrap_dim("unsqueeze", int("unsqueeze", args, 0)?, base.shape().len() + 1)?;
	Ok(ScatterPlan::single(ScatterStep::inverse("squeeze", [Scalar::Int(dim as i64)])))
}

/// Re-inserts every size-1 dim the squeeze removed, lowest first.
fn squeeze_scatter(base: &Tensor, args: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	let shape = base.shape();
	let removed: Vec<usize> = match opt_int("squeeze", args, 0)? {
		Some(dim) => {
			let dim = wrap_dim("squeeze", dim, shape.len())?;
			(shape[dim] == 1).then_some(dim).into_iter().collect()
		}
		None => (0..shape.len()).filter(|&d| shape[d] == 1).collect(),
	};
	tracing::trace!(?removed, "tensor.squeeze_scatter");
	Ok(removed.into_iter().fold(ScatterPlan::new(), |plan, dim| {
		plan.then(ScatterStep::inverse("unsqueeze", [Scalar::Int(dim as i64)]))
	}))
}
