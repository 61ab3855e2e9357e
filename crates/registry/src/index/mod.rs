#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Operation registry index.
//!
//! # Purpose
//!
//! Maps operation symbols to their [`OpDef`]: the direct kernel, the classification
//! the functionalizer dispatches on, and (for views) the scatter form that inverts
//! the view.
//!
//! # Mental Model
//!
//! 1. **Build Phase:** [`RegistryBuilder`] ingests definitions and rejects duplicate
//!    symbols.
//! 2. **Publication:** [`RegistryBuilder::build`] sorts definitions by symbol and
//!    produces an immutable [`OpRegistry`].
//! 3. **Consumption:** Callers resolve symbols with [`OpRegistry::lookup`] and execute
//!    them with [`OpRegistry::run`] / [`OpRegistry::run_scatter`].
//!
//! # Invariants
//!
//! - Must have unambiguous symbol lookup (one definition per symbol).
//!   - Enforced in: [`RegistryBuilder::register`].
//!   - Tested by: [`crate::index::invariants::test_unambiguous_lookup`]
//!   - Failure symptom: the same symbol dispatches to different kernels.
//!
//! - Must maintain deterministic iteration order (sorted by symbol).
//!   - Enforced in: [`RegistryBuilder::build`].
//!   - Tested by: [`crate::index::invariants::test_deterministic_iteration`]
//!   - Failure symptom: reports and dumps change order between runs.
//!
//! - Must reject kernel results whose output count contradicts the declared arity.
//!   - Enforced in: [`OpRegistry::run`].
//!   - Tested by: [`crate::index::invariants::test_arity_enforced`]
//!   - Failure symptom: a single-output caller silently drops results.
//!
//! - Must return the update unchanged for an empty scatter plan.
//!   - Enforced in: [`OpRegistry::run_scatter`].
//!   - Tested by: [`crate::index::invariants::test_empty_plan_is_identity`]
//!   - Failure symptom: identity views (e.g. a full-size slice) lose writes.

mod build;

pub use build::RegistryBuilder;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::def::{OpDef, OpKind, ScatterOperand, ScatterPlan};
use crate::error::{KernelError, RegistryError, Result};
use crate::value::{Arity, Outputs, Scalar};

/// Immutable lookup table from operation symbol to definition.
pub struct OpRegistry<V> {
	label: &'static str,
	defs: Vec<OpDef<V>>,
	by_name: FxHashMap<&'static str, usize>,
}

impl<V> OpRegistry<V> {
	/// Name of the registry, used in diagnostics.
	pub fn label(&self) -> &'static str {
		self.label
	}

	pub fn len(&self) -> usize {
		self.defs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.defs.is_empty()
	}

	#[inline]
	pub fn get(&self, name: &str) -> Option<&OpDef<V>> {
		self.by_name.get(name).map(|&idx| &self.defs[idx])
	}

	/// Resolves a symbol, suggesting the closest registered one on failure.
	pub fn lookup(&self, name: &str) -> Result<&OpDef<V>> {
		self.get(name).ok_or_else(|| RegistryError::UnknownOp {
			name: name.to_string(),
			suggestion: self.closest(name),
		})
	}

	/// Definitions in symbol order.
	pub fn iter(&self) -> impl Iterator<Item = &OpDef<V>> {
		self.defs.iter()
	}

	fn closest(&self, name: &str) -> Option<&'static str> {
		self.defs
			.iter()
			.map(|def| (def.name, strsim::jaro_winkler(name, def.name)))
			.filter(|(_, score)| *score > 0.8)
			.max_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(name, _)| name)
	}

	/// Reports definitions whose counterparts are missing or of the wrong kind.
	pub fn check(&self) -> Vec<Dangling> {
		let mut problems = Vec::new();
		for def in &self.defs {
			let (counterpart, want_view) = match def.kind {
				OpKind::Pure => continue,
				OpKind::View { scatter } => {
					if scatter.is_none() {
						problems.push(Dangling {
							op: def.name,
							problem: DanglingKind::MissingScatter,
						});
					}
					continue;
				}
				OpKind::InPlace { functional } => (functional, false),
				OpKind::InPlaceView { functional } => (functional, true),
				OpKind::CopyInto { substitute } => (substitute, false),
			};
			let problem = match self.get(counterpart) {
				None => Some(DanglingKind::MissingCounterpart(counterpart)),
				Some(other) if want_view && !other.kind.is_view() => {
					Some(DanglingKind::CounterpartKind {
						counterpart,
						expected: "view",
					})
				}
				Some(other) if !want_view && !other.kind.is_pure() => {
					Some(DanglingKind::CounterpartKind {
						counterpart,
						expected: "pure",
					})
				}
				Some(_) => None,
			};
			if let Some(problem) = problem {
				problems.push(Dangling {
					op: def.name,
					problem,
				});
			}
		}
		problems
	}
}

impl<V: Clone> OpRegistry<V> {
	/// Executes `name`'s kernel and checks the output count against its arity.
	pub fn run(&self, name: &str, tensors: &[V], scalars: &[Scalar]) -> Result<Outputs<V>> {
		let def = self.lookup(name)?;
		Ok(invoke(def, tensors, scalars)?)
	}

	/// Executes a scatter plan, reporting every issued step to `observe`.
	///
	/// `observe` receives the step's op symbol, its tensor inputs, its output and
	/// its scalars, in issue order.
	pub fn run_scatter(
		&self,
		plan: &ScatterPlan,
		base: &V,
		update: V,
		mut observe: impl FnMut(&'static str, &[V], &V, &[Scalar]),
	) -> Result<V> {
		let mut current = update;
		for step in plan.steps() {
			let inputs: SmallVec<[V; 2]> = step
				.operands
				.iter()
				.map(|operand| match operand {
					ScatterOperand::Base => base.clone(),
					ScatterOperand::Update => current.clone(),
				})
				.collect();
			let def = self.lookup(step.op)?;
			let out = invoke(def, &inputs, &step.scalars)?;
			let out = single(def.name, out)?;
			observe(def.name, &inputs, &out, &step.scalars);
			current = out;
		}
		Ok(current)
	}
}

/// Runs a definition's kernel, enforcing its declared arity.
pub fn invoke<V>(
	def: &OpDef<V>,
	tensors: &[V],
	scalars: &[Scalar],
) -> std::result::Result<Outputs<V>, KernelError> {
	let out = (def.kernel)(tensors, scalars)?;
	if out.arity() != def.arity {
		return Err(KernelError::Arity {
			op: def.name.to_string(),
			expected: def.arity.to_string(),
			actual: out.len(),
		});
	}
	Ok(out)
}

fn single<V>(op: &str, out: Outputs<V>) -> std::result::Result<V, KernelError> {
	let actual = out.len();
	out.single().ok_or_else(|| KernelError::Arity {
		op: op.to_string(),
		expected: Arity::Single.to_string(),
		actual,
	})
}

/// A definition whose counterpart cannot be used by the functionalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dangling {
	pub op: &'static str,
	pub problem: DanglingKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingKind {
	/// A view has no scatter form.
	MissingScatter,
	/// The named counterpart is not registered.
	MissingCounterpart(&'static str),
	/// The counterpart exists but is of the wrong kind.
	CounterpartKind {
		counterpart: &'static str,
		expected: &'static str,
	},
}

#[cfg(any(test, doc))]
pub(crate) mod invariants;

#[cfg(test)]
mod tests;
