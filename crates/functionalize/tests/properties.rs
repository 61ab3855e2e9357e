//! Random programs over views and mutations, run directly and functionalized.
//!
//! A step that fails under direct execution must fail functionalized too; it
//! leaves both value pools untouched and the program carries on.

mod common;

use std::sync::Arc;

use common::init_tracing;
use proptest::prelude::*;
use purify_functionalize::{CaptureLog, FlushPolicy, FunctionalizationGuard, Functionalizer, Operand, SessionConfig};
use purify_registry::Eager;
use purify_tensor::{Tensor, TensorOps, builtin_registry};

#[derive(Debug, Clone)]
enum Step {
	View(usize, usize),
	Reshape(usize, usize),
	Transpose(usize),
	Diagonal(usize),
	Select(usize, usize, usize),
	Slice(usize, usize, usize, usize),
	Split(usize, usize),
	Unsqueeze(usize, usize),
	Squeeze(usize),
	Scale(usize),
	AddScalar(usize, i8),
	Fill(usize, i8),
	AddFrom(usize, usize),
	CopyFrom(usize, usize),
	TransposeInPlace(usize),
	UnsqueezeInPlace(usize, usize),
	SqueezeInPlace(usize),
}

fn step() -> impl Strategy<Value = Step> {
	let n = || 0usize..64;
	prop_oneof![
		(n(), n()).prop_map(|(a, b)| Step::View(a, b)),
		(n(), n()).prop_map(|(a, b)| Step::Reshape(a, b)),
		n().prop_map(Step::Transpose),
		n().prop_map(Step::Diagonal),
		(n(), n(), n()).prop_map(|(a, b, c)| Step::Select(a, b, c)),
		(n(), n(), n(), n()).prop_map(|(a, b, c, e)| Step::Slice(a, b, c, e)),
		(n(), n()).prop_map(|(a, b)| Step::Split(a, b)),
		(n(), n()).prop_map(|(a, b)| Step::Unsqueeze(a, b)),
		n().prop_map(Step::Squeeze),
		n().prop_map(Step::Scale),
		(n(), any::<i8>()).prop_map(|(a, c)| Step::AddScalar(a, c)),
		(n(), any::<i8>()).prop_map(|(a, c)| Step::Fill(a, c)),
		(n(), n()).prop_map(|(a, b)| Step::AddFrom(a, b)),
		(n(), n()).prop_map(|(a, b)| Step::CopyFrom(a, b)),
		n().prop_map(Step::TransposeInPlace),
		(n(), n()).prop_map(|(a, b)| Step::UnsqueezeInPlace(a, b)),
		n().prop_map(Step::SqueezeInPlace),
	]
}

fn input(rows: usize, cols: usize) -> Tensor {
	let data = (0..rows * cols).map(|i| i as f32).collect();
	Tensor::from_vec(data, &[rows, cols]).unwrap()
}

/// Target shape for viewing or reshaping `shape`: the shape itself, the
/// flattened shape, or any two-factor split of the element count.
fn reshape_target(shape: &[usize], pick: usize) -> Vec<i64> {
	let numel: usize = shape.iter().product();
	let mut options = vec![shape.iter().map(|&s| s as i64).collect::<Vec<_>>(), vec![numel as i64]];
	for d in (1..=numel).filter(|d| numel % d == 0) {
		options.push(vec![(numel / d) as i64, d as i64]);
	}
	let pick = pick % options.len();
	options.swap_remove(pick)
}

/// Applies one step to the value pool. Shape-dependent parameters are reduced
/// against the current shapes, so both executions pick the same arguments.
fn apply<D: TensorOps>(d: &mut D, pool: &mut Vec<D::Value>, step: &Step) -> Result<(), D::Error> {
	let n = pool.len();
	let get = |i: usize| pool[i % n].clone();
	match *step {
		Step::View(i, pick) => {
			let v = get(i);
			let shape = reshape_target(&d.shape(&v), pick);
			let out = d.view(&v, &shape)?;
			pool.push(out);
		}
		Step::Reshape(i, pick) => {
			let v = get(i);
			let shape = reshape_target(&d.shape(&v), pick);
			let out = d.reshape(&v, &shape)?;
			pool.push(out);
		}
		Step::Transpose(i) => {
			let v = get(i);
			let ndim = d.shape(&v).len() as i64;
			if ndim > 0 {
				let out = d.transpose(&v, 0, ndim - 1)?;
				pool.push(out);
			}
		}
		Step::Diagonal(i) => {
			let v = get(i);
			if d.shape(&v).len() == 2 {
				let out = d.diagonal(&v)?;
				pool.push(out);
			}
		}
		Step::Select(i, dim, index) => {
			let v = get(i);
			let shape = d.shape(&v);
			if !shape.is_empty() {
				let dim = dim % shape.len();
				if shape[dim] > 0 {
					let out = d.select(&v, dim as i64, (index % shape[dim]) as i64)?;
					pool.push(out);
				}
			}
		}
		Step::Slice(i, dim, start, len) => {
			let v = get(i);
			let shape = d.shape(&v);
			if !shape.is_empty() {
				let dim = dim % shape.len();
				let size = shape[dim];
				if size > 0 {
					let start = start % size;
					let end = start + 1 + len % (size - start);
					let out = d.slice(&v, dim as i64, start as i64, end as i64)?;
					pool.push(out);
				}
			}
		}
		Step::Split(i, size) => {
			let v = get(i);
			let shape = d.shape(&v);
			if shape.first().is_some_and(|&rows| rows > 0) {
				let parts = d.split(&v, (1 + size % shape[0]) as i64)?;
				pool.extend(parts);
			}
		}
		Step::Unsqueeze(i, dim) => {
			let v = get(i);
			let ndim = d.shape(&v).len();
			let out = d.unsqueeze(&v, (dim % (ndim + 1)) as i64)?;
			pool.push(out);
		}
		Step::Squeeze(i) => {
			let v = get(i);
			let out = d.squeeze(&v)?;
			pool.push(out);
		}
		Step::Scale(i) => {
			let v = get(i);
			let out = d.mul_scalar(&v, 2.0)?;
			pool.push(out);
		}
		Step::AddScalar(i, c) => {
			d.add_scalar_(&get(i), f64::from(c))?;
		}
		Step::Fill(i, c) => {
			d.fill_(&get(i), f64::from(c))?;
		}
		Step::AddFrom(i, j) => {
			d.add_(&get(i), &get(j))?;
		}
		Step::CopyFrom(i, j) => {
			d.copy_(&get(i), &get(j))?;
		}
		Step::TransposeInPlace(i) => {
			let v = get(i);
			let ndim = d.shape(&v).len() as i64;
			if ndim > 0 {
				d.transpose_(&v, 0, ndim - 1)?;
			}
		}
		Step::UnsqueezeInPlace(i, dim) => {
			let v = get(i);
			let ndim = d.shape(&v).len();
			d.unsqueeze_(&v, (dim % (ndim + 1)) as i64)?;
		}
		Step::SqueezeInPlace(i) => {
			d.squeeze_(&get(i))?;
		}
	}
	Ok(())
}

struct Compared {
	session: Functionalizer<Tensor>,
	eager: Vec<Tensor>,
	functional: Vec<Operand<Tensor>>,
	log: CaptureLog,
}

fn run_both(rows: usize, cols: usize, steps: &[Step], flush: FlushPolicy) -> Compared {
	init_tracing();
	let registry = builtin_registry().unwrap();
	let mut direct = Eager::new(&registry);
	let mut eager = vec![input(rows, cols)];
	let accepted: Vec<bool> = steps
		.iter()
		.map(|step| apply(&mut direct, &mut eager, step).is_ok())
		.collect();

	let config = SessionConfig {
		flush,
		..SessionConfig::default()
	};
	let mut session = Functionalizer::with_config(Arc::new(builtin_registry().unwrap()), config);
	let log = CaptureLog::new();
	session.set_sink(log.clone());
	let mut functional = vec![Operand::Tracked(session.wrap(input(rows, cols)))];
	{
		let _guard = FunctionalizationGuard::new().unwrap();
		for (step, ok) in steps.iter().zip(accepted) {
			match (ok, apply(&mut session, &mut functional, step)) {
				(true, Err(err)) => panic!("{step:?} succeeded directly but failed functionalized: {err}"),
				(false, Ok(())) => panic!("{step:?} failed directly but succeeded functionalized"),
				_ => {}
			}
		}
	}
	Compared {
		session,
		eager,
		functional,
		log,
	}
}

fn programs() -> impl Strategy<Value = (usize, usize, Vec<Step>)> {
	(1usize..4, 1usize..4, prop::collection::vec(step(), 1..12))
}

proptest! {
	#[test]
	fn functionalized_matches_direct((rows, cols, steps) in programs(), eager_flush in any::<bool>()) {
		let flush = if eager_flush { FlushPolicy::Eager } else { FlushPolicy::Lazy };
		let mut c = run_both(rows, cols, &steps, flush);
		prop_assert_eq!(c.eager.len(), c.functional.len());
		for (idx, (direct, value)) in c.eager.iter().zip(&c.functional).enumerate() {
			let t = value.tracked().unwrap();
			let out = c.session.unwrap(t).unwrap();
			prop_assert_eq!(out.shape(), direct.shape(), "value {} shape", idx);
			prop_assert_eq!(out.to_vec(), direct.to_vec(), "value {} contents", idx);
		}
	}

	#[test]
	fn aliasing_is_preserved((rows, cols, steps) in programs()) {
		let c = run_both(rows, cols, &steps, FlushPolicy::Lazy);
		for i in 0..c.eager.len() {
			for j in i + 1..c.eager.len() {
				let (a, b) = (c.functional[i].tracked().unwrap(), c.functional[j].tracked().unwrap());
				prop_assert_eq!(
					c.session.are_aliased(a, b).unwrap(),
					c.eager[i].shares_storage(&c.eager[j]),
					"values {} and {}", i, j
				);
			}
		}
	}

	#[test]
	fn synchronize_is_idempotent((rows, cols, steps) in programs()) {
		let mut c = run_both(rows, cols, &steps, FlushPolicy::Lazy);
		let handles: Vec<_> = c.functional.iter().map(|v| v.tracked().unwrap().clone()).collect();
		let first: Vec<_> = handles.iter().map(|t| c.session.unwrap(t).unwrap()).collect();
		let issued = c.log.lines().len();
		for t in &handles {
			c.session.synchronize(t).unwrap();
		}
		let second: Vec<_> = handles.iter().map(|t| c.session.unwrap(t).unwrap()).collect();
		prop_assert_eq!(c.log.lines().len(), issued);
		for (a, b) in first.iter().zip(&second) {
			prop_assert!(a.same_object(b));
		}
	}
}
