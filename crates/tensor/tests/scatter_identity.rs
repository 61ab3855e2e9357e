//! `scatter(v, view(v, args), args) == v` for every builtin view op.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use purify_registry::{OpRegistry, Scalar};
use purify_tensor::{Tensor, builtin_registry};
// Library dependencies this target links without naming.
use smallvec as _;
use tracing as _;

fn values(shape: &[usize], seed: u32) -> Tensor {
	let numel = shape.iter().product::<usize>();
	let data = (0..numel)
		.map(|i| ((i as u32).wrapping_mul(2_654_435_761).wrapping_add(seed) % 97) as f32 - 48.0)
		.collect();
	Tensor::from_vec(data, shape).unwrap()
}

/// Runs `op` on `base` and writes every output straight back.
fn assert_identity(registry: &OpRegistry<Tensor>, op: &str, base: &Tensor, args: &[Scalar]) {
	let def = registry.lookup(op).unwrap();
	let scatter = def.scatter().unwrap();
	let outputs = registry.run(op, &[base.clone()], args).unwrap().into_vec();
	for (idx, view) in outputs.into_iter().enumerate() {
		let plan = scatter(base, args, idx).unwrap();
		// the kernels alias; hand the scatter a detached copy like the engine does
		let update = view.contiguous_copy();
		let restored = registry.run_scatter(&plan, base, update, |_, _, _, _| {}).unwrap();
		assert_eq!(restored.shape(), base.shape(), "{op} {args:?} output {idx}");
		assert!(restored.same_values(base), "{op} {args:?} output {idx}");
	}
}

fn shapes() -> impl Strategy<Value = (usize, usize)> {
	(1usize..5, 1usize..5)
}

proptest! {
	#[test]
	fn scatter_identity_every_view((rows, cols) in shapes(), seed in any::<u32>(), pick in 0usize..16) {
		let registry = builtin_registry().unwrap();
		let base = values(&[rows, cols], seed);
		let (r, c) = (rows as i64, cols as i64);

		assert_identity(&registry, "view", &base, &[Scalar::ints([r * c])]);
		assert_identity(&registry, "reshape", &base, &[Scalar::ints([c, r])]);
		assert_identity(&registry, "transpose", &base, &[Scalar::Int(0), Scalar::Int(1)]);
		assert_identity(&registry, "diagonal", &base, &[]);
		assert_identity(&registry, "select", &base, &[Scalar::Int(0), Scalar::Int(pick as i64 % r)]);
		assert_identity(&registry, "select", &base, &[Scalar::Int(1), Scalar::Int(pick as i64 % c)]);
		let start = pick as i64 % r;
		assert_identity(&registry, "slice", &base, &[Scalar::Int(0), Scalar::Int(start), Scalar::Int(r)]);
		assert_identity(&registry, "split", &base, &[Scalar::Int(1 + pick as i64 % r)]);
		assert_identity(&registry, "split", &base, &[Scalar::Int(1 + pick as i64 % c), Scalar::Int(1)]);
		assert_identity(&registry, "unsqueeze", &base, &[Scalar::Int(pick as i64 % 3)]);
		assert_identity(&registry, "squeeze", &base, &[]);
		assert_identity(&registry, "squeeze", &base, &[Scalar::Int(0)]);
	}

	#[test]
	fn scatter_touches_only_the_view_region((rows, cols) in shapes(), seed in any::<u32>()) {
		let registry = builtin_registry().unwrap();
		let base = values(&[rows, cols], seed);
		let diag = registry.run("diagonal", &[base.clone()], &[]).unwrap().single().unwrap();
		let bumped = registry.run("add", &[diag], &[Scalar::Float(1000.0)]).unwrap().single().unwrap();
		let plan = registry.lookup("diagonal").unwrap().scatter().unwrap()(&base, &[], 0).unwrap();
		let out = registry.run_scatter(&plan, &base, bumped, |_, _, _, _| {}).unwrap().to_vec();
		let before = base.to_vec();
		for (i, (old, new)) in before.iter().zip(&out).enumerate() {
			let on_diag = i / cols == i % cols;
			if on_diag {
				prop_assert_eq!(*new, *old + 1000.0);
			} else {
				prop_assert_eq!(*new, *old);
			}
		}
	}
}
