use pretty_assertions::assert_eq;

use crate::def::{OpDef, ScatterOperand, ScatterPlan, ScatterStep};
use crate::error::{KernelResult, RegistryError};
use crate::index::{Dangling, DanglingKind, RegistryBuilder};
use crate::value::{Outputs, Scalar};

fn add(t: &[i64], _: &[Scalar]) -> KernelResult<Outputs<i64>> {
	Ok(Outputs::Single(t[0] + t[1]))
}

fn take(t: &[i64], _: &[Scalar]) -> KernelResult<Outputs<i64>> {
	Ok(Outputs::Single(t[0]))
}

fn take_scatter(_: &i64, _: &[Scalar], _: usize) -> KernelResult<ScatterPlan> {
	Ok(ScatterPlan::single(ScatterStep::scatter("put", [])))
}

#[test]
fn test_lookup_suggests_closest_symbol() {
	let mut builder = RegistryBuilder::<i64>::new("test");
	builder.register(OpDef::pure("diagonal", "", take)).unwrap();
	builder.register(OpDef::pure("add", "", add)).unwrap();
	let registry = builder.build();

	match registry.lookup("diagonl").unwrap_err() {
		RegistryError::UnknownOp { name, suggestion } => {
			assert_eq!(name, "diagonl");
			assert_eq!(suggestion, Some("diagonal"));
		}
		other => panic!("unexpected error: {other:?}"),
	}
	let err = registry.lookup("qqqqqq").unwrap_err();
	assert_eq!(err.to_string(), "unknown operation: qqqqqq");
}

#[test]
fn test_check_reports_dangling_counterparts() {
	let mut builder = RegistryBuilder::<i64>::new("test");
	builder
		.extend([
			OpDef::pure("add", "", add),
			OpDef::in_place("add_", "", add, "add"),
			OpDef::in_place("mul_", "", add, "mul"),
			OpDef::in_place_view("take_", "", take, "add"),
			OpDef::copy_into("copy_", "", take, "take"),
			OpDef::view("take", "", take, take_scatter),
		])
		.unwrap();
	let mut unscattered = OpDef::view("peek", "", take, take_scatter);
	unscattered.kind = crate::def::OpKind::View { scatter: None };
	builder.register(unscattered).unwrap();

	let problems = builder.build().check();
	assert_eq!(
		problems,
		vec![
			Dangling {
				op: "copy_",
				problem: DanglingKind::CounterpartKind {
					counterpart: "take",
					expected: "pure"
				},
			},
			Dangling {
				op: "mul_",
				problem: DanglingKind::MissingCounterpart("mul"),
			},
			Dangling {
				op: "peek",
				problem: DanglingKind::MissingScatter,
			},
			Dangling {
				op: "take_",
				problem: DanglingKind::CounterpartKind {
					counterpart: "add",
					expected: "view"
				},
			},
		]
	);
}

#[test]
fn test_scatter_step_shapes() {
	let step = ScatterStep::scatter("slice_scatter", [Scalar::Int(0), Scalar::Int(2)]);
	assert_eq!(
		step.operands.as_slice(),
		&[ScatterOperand::Base, ScatterOperand::Update]
	);
	let step = ScatterStep::inverse("view", [Scalar::ints([4, 2])]);
	assert_eq!(step.operands.as_slice(), &[ScatterOperand::Update]);

	let plan = ScatterPlan::new()
		.then(ScatterStep::inverse("unsqueeze", [Scalar::Int(0)]))
		.then(ScatterStep::inverse("unsqueeze", [Scalar::Int(2)]));
	assert_eq!(plan.steps().len(), 2);
}

#[test]
fn test_run_scatter_feeds_base_and_running_update() {
	fn put(t: &[i64], _: &[Scalar]) -> KernelResult<Outputs<i64>> {
		Ok(Outputs::Single(t[0] * 100 + t[1]))
	}
	let mut builder = RegistryBuilder::<i64>::new("test");
	builder.register(OpDef::pure("put", "", put)).unwrap();
	builder.register(OpDef::pure("add", "", add)).unwrap();
	let registry = builder.build();

	let plan = ScatterPlan::single(ScatterStep::scatter("put", []))
		.then(ScatterStep::scatter("add", []));
	let mut seen = Vec::new();
	let out = registry
		.run_scatter(&plan, &7, 3, |op, inputs, out, _| {
			seen.push((op, inputs.to_vec(), *out))
		})
		.unwrap();
	assert_eq!(out, 710);
	assert_eq!(seen, vec![("put", vec![7, 3], 703), ("add", vec![7, 703], 710)]);
}
