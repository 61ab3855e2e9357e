#![allow(dead_code)]

use std::sync::Arc;

use purify_tensor::{Tensor, TensorOps, builtin_registry};

use crate::handle::Operand;
use crate::mode::FunctionalizationGuard;
use crate::trace::CaptureLog;
use crate::Functionalizer;

fn session() -> Functionalizer<Tensor> {
	Functionalizer::new(Arc::new(builtin_registry().unwrap()))
}

fn tracked(op: &Operand<Tensor>) -> &crate::FunctionalTensor {
	op.tracked().unwrap()
}

/// Invariant: operands MUST be synchronized before they are read.
pub(crate) fn inv_reads_see_prior_writes() {
	let _guard = FunctionalizationGuard::new().unwrap();
	let mut f = session();
	let x = Operand::Tracked(f.wrap(Tensor::zeros(&[2, 2])));
	let row = f.select(&x, 0, 1).unwrap();
	let ones = Operand::Plain(Tensor::ones(&[2]));
	f.add_(&row, &ones).unwrap();

	let col = f.select(&x, 1, 0).unwrap();
	let col = f.unwrap(tracked(&col)).unwrap();
	assert_eq!(col.to_vec(), vec![0.0, 1.0]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_reads_see_prior_writes() {
	inv_reads_see_prior_writes();
}

/// Invariant: writes MUST reach the root in the order they were issued.
pub(crate) fn inv_writes_apply_in_issue_order() {
	let _guard = FunctionalizationGuard::new().unwrap();
	let mut f = session();
	let x = Operand::Tracked(f.wrap(Tensor::zeros(&[3])));
	let a = f.slice(&x, 0, 0, 2).unwrap();
	let b = f.slice(&x, 0, 1, 3).unwrap();
	f.fill_(&a, 1.0).unwrap();
	f.fill_(&b, 2.0).unwrap();

	let out = f.unwrap(tracked(&x)).unwrap();
	assert_eq!(out.to_vec(), vec![1.0, 2.0, 2.0]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_writes_apply_in_issue_order() {
	inv_writes_apply_in_issue_order();
}

/// Invariant: synchronization MUST be idempotent.
pub(crate) fn inv_sync_is_idempotent() {
	let _guard = FunctionalizationGuard::new().unwrap();
	let mut f = session();
	let log = CaptureLog::new();
	f.set_sink(log.clone());
	let x = Operand::Tracked(f.wrap(Tensor::ones(&[2, 2])));
	let d = f.diagonal(&x).unwrap();
	f.add_scalar_(&d, 1.0).unwrap();

	f.synchronize(tracked(&x)).unwrap();
	f.synchronize(tracked(&d)).unwrap();
	let first = f.unwrap(tracked(&x)).unwrap();
	let first_view = f.unwrap(tracked(&d)).unwrap();
	let emitted = log.lines().len();
	f.synchronize(tracked(&x)).unwrap();
	f.synchronize(tracked(&d)).unwrap();
	let second = f.unwrap(tracked(&x)).unwrap();
	let second_view = f.unwrap(tracked(&d)).unwrap();

	assert!(first.same_object(&second));
	assert!(first_view.same_object(&second_view));
	assert_eq!(log.lines().len(), emitted);
}

#[cfg_attr(test, test)]
pub(crate) fn test_sync_is_idempotent() {
	inv_sync_is_idempotent();
}

/// Invariant: the engine MUST never run a mutating kernel against a tracked value.
pub(crate) fn inv_inputs_never_mutated() {
	let _guard = FunctionalizationGuard::new().unwrap();
	let mut f = session();
	let raw = Tensor::ones(&[4, 2]);
	let x = Operand::Tracked(f.wrap(raw.clone()));
	let y = f.view(&x, &[8]).unwrap();
	f.mul_(&y, &Operand::Plain(Tensor::full(&[8], 3.0))).unwrap();
	f.transpose_(&x, 0, 1).unwrap();
	f.copy_(&x, &Operand::Plain(Tensor::zeros(&[2, 4]))).unwrap();
	f.unwrap(tracked(&y)).unwrap();

	assert_eq!(raw.to_vec(), vec![1.0; 8]);
	assert_eq!(raw.shape(), vec![4, 2]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_inputs_never_mutated() {
	inv_inputs_never_mutated();
}
