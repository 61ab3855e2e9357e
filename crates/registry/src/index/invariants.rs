#![allow(dead_code)]

use crate::def::{OpDef, ScatterPlan, ScatterStep};
use crate::error::{KernelError, KernelResult, RegistryError};
use crate::index::RegistryBuilder;
use crate::value::{Outputs, Scalar};

fn neg(t: &[i64], _: &[Scalar]) -> KernelResult<Outputs<i64>> {
	Ok(Outputs::Single(-t[0]))
}

fn halves(t: &[i64], _: &[Scalar]) -> KernelResult<Outputs<i64>> {
	Ok(Outputs::Multi(vec![t[0] / 2, t[0] - t[0] / 2]))
}

fn identity(t: &[i64], _: &[Scalar]) -> KernelResult<Outputs<i64>> {
	Ok(Outputs::Single(t[0]))
}

fn identity_scatter(_: &i64, _: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	Ok(ScatterPlan::new())
}

/// Invariant: symbol lookup MUST be unambiguous.
///
/// A second definition under an existing symbol is rejected instead of shadowing it.
pub(crate) fn inv_unambiguous_lookup() {
	let mut builder = RegistryBuilder::<i64>::new("test");
	builder
		.register(OpDef::pure("neg", "first", neg))
		.expect("first registration");
	let err = builder
		.register(OpDef::pure("neg", "second", identity))
		.unwrap_err();
	assert_eq!(
		err,
		RegistryError::DuplicateOp {
			registry: "test",
			name: "neg"
		}
	);

	let registry = builder.build();
	assert_eq!(registry.len(), 1);
	assert_eq!(registry.lookup("neg").unwrap().description, "first");
}

#[cfg_attr(test, test)]
pub(crate) fn test_unambiguous_lookup() {
	inv_unambiguous_lookup()
}

/// Invariant: iteration MUST be sorted by symbol regardless of registration order.
pub(crate) fn inv_deterministic_iteration() {
	let mut builder = RegistryBuilder::<i64>::new("test");
	for name in ["zeta", "alpha", "mid"] {
		builder.register(OpDef::pure(name, "", neg)).unwrap();
	}
	let names: Vec<_> = builder.build().iter().map(|def| def.name).collect();
	assert_eq!(names, ["alpha", "mid", "zeta"]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_deterministic_iteration() {
	inv_deterministic_iteration()
}

/// Invariant: a kernel's output count MUST match its declared arity.
pub(crate) fn inv_arity_enforced() {
	let mut builder = RegistryBuilder::<i64>::new("test");
	builder.register(OpDef::pure("liar", "", halves)).unwrap();
	builder
		.register(OpDef::view("halves", "", halves, identity_scatter).multi())
		.unwrap();
	let registry = builder.build();

	let err = registry.run("liar", &[5], &[]).unwrap_err();
	assert!(
		matches!(err, RegistryError::Kernel(KernelError::Arity { actual: 2, .. })),
		"unexpected error: {err:?}"
	);
	assert_eq!(
		registry.run("halves", &[5], &[]).unwrap(),
		Outputs::Multi(vec![2, 3])
	);
}

#[cfg_attr(test, test)]
pub(crate) fn test_arity_enforced() {
	inv_arity_enforced()
}

/// Invariant: an empty scatter plan MUST hand the update back untouched.
pub(crate) fn inv_empty_plan_is_identity() {
	let mut builder = RegistryBuilder::<i64>::new("test");
	builder
		.register(OpDef::view("alias", "", identity, identity_scatter))
		.unwrap();
	builder.register(OpDef::pure("neg", "", neg)).unwrap();
	let registry = builder.build();

	let mut issued = Vec::new();
	let out = registry
		.run_scatter(&ScatterPlan::new(), &1, 42, |op, _, _, _| issued.push(op))
		.unwrap();
	assert_eq!(out, 42);
	assert!(issued.is_empty());

	let plan = ScatterPlan::single(ScatterStep::inverse("neg", []));
	let out = registry
		.run_scatter(&plan, &1, 42, |op, _, _, _| issued.push(op))
		.unwrap();
	assert_eq!(out, -42);
	assert_eq!(issued, ["neg"]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_empty_plan_is_identity() {
	inv_empty_plan_is_identity()
}
