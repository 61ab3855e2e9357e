#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Functionalization session.
//!
//! # Purpose
//!
//! [`Functionalizer`] is the [`Dispatch`] implementation user programs run
//! against while functionalization is enabled. Every call touching a tracked
//! operand is classified by its registry definition and rewritten into pure
//! registry calls; mutations become new values in the alias graph and writes
//! through views are queued for their root.
//!
//! # Mental Model
//!
//! - **Interception** (`intercept.rs`): classify, resolve operands, issue the
//!   functional form, link results. Calls whose operands are all plain bypass
//!   the engine.
//! - **Synchronization** (`sync.rs`): flush the root's queued writes in issue
//!   order (replaying intermediate views forward, then scattering back), then
//!   regenerate stale views from their base.
//!
//! # Invariants
//!
//! - Operands MUST be synchronized before they are read.
//!   - Enforced in: [`Functionalizer::resolve`].
//!   - Tested by: [`crate::session::invariants::test_reads_see_prior_writes`]
//!   - Failure symptom: a read through one alias misses a write made through another.
//!
//! - Writes MUST reach the root in the order they were issued.
//!   - Enforced in: [`Functionalizer::flush`].
//!   - Tested by: [`crate::session::invariants::test_writes_apply_in_issue_order`]
//!   - Failure symptom: overlapping view writes resolve to the older value.
//!
//! - Synchronization MUST be idempotent.
//!   - Enforced in: [`Functionalizer::sync_node`] (flush does not bump generations).
//!   - Tested by: [`crate::session::invariants::test_sync_is_idempotent`]
//!   - Failure symptom: a second `synchronize` re-scatters and the trace grows.
//!
//! - The engine MUST never run a mutating kernel against a tracked value.
//!   - Enforced in: [`Functionalizer::rewrite_in_place`], [`Functionalizer::rewrite_copy`].
//!   - Tested by: [`crate::session::invariants::test_inputs_never_mutated`]
//!   - Failure symptom: the caller's wrapped input changes before `unwrap`.

mod intercept;
mod sync;

use std::sync::Arc;

use purify_registry::{Dispatch, OpRegistry, Outputs, RawValue, Scalar};

use crate::config::{CollectPolicy, SessionConfig};
use crate::error::{FunctionalizeError, InvalidState, Result};
use crate::graph::{AliasGraph, NodeId};
use crate::handle::{DropQueue, FunctionalTensor, Operand, SessionId};
use crate::trace::{OpRecord, TraceSink};

struct Tracer<V> {
	sink: Option<Box<dyn TraceSink<V>>>,
	enabled: bool,
}

impl<V> Tracer<V> {
	fn emit(&mut self, op: &str, inputs: &[V], outputs: &[V], scalars: &[Scalar]) {
		if !self.enabled {
			return;
		}
		if let Some(sink) = self.sink.as_mut() {
			sink.record(&OpRecord {
				op,
				inputs,
				outputs,
				scalars,
			});
		}
	}
}

/// Functionalization session over raw values `V`.
pub struct Functionalizer<V: RawValue> {
	registry: Arc<OpRegistry<V>>,
	graph: AliasGraph<V>,
	tracer: Tracer<V>,
	config: SessionConfig,
	id: SessionId,
	drops: DropQueue,
}

impl<V: RawValue> Functionalizer<V> {
	pub fn new(registry: Arc<OpRegistry<V>>) -> Self {
		Self::with_config(registry, SessionConfig::default())
	}

	pub fn with_config(registry: Arc<OpRegistry<V>>, config: SessionConfig) -> Self {
		let id = SessionId::next();
		tracing::debug!(session = ?id, registry = registry.label(), ?config, "functionalize.session");
		Self {
			registry,
			graph: AliasGraph::new(),
			tracer: Tracer {
				sink: None,
				enabled: config.trace,
			},
			config,
			id,
			drops: DropQueue::default(),
		}
	}

	/// Installs the sink that receives every issued operation.
	pub fn set_sink(&mut self, sink: impl TraceSink<V> + 'static) {
		self.tracer.sink = Some(Box::new(sink));
	}

	pub fn take_sink(&mut self) -> Option<Box<dyn TraceSink<V>>> {
		self.tracer.sink.take()
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	pub fn registry(&self) -> &OpRegistry<V> {
		&self.registry
	}

	pub fn graph(&self) -> &AliasGraph<V> {
		&self.graph
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	/// Registers `raw` as a fresh root.
	pub fn wrap(&mut self, raw: V) -> FunctionalTensor {
		self.entry();
		let node = self.graph.insert_root(raw);
		tracing::trace!(node = node.index(), "functionalize.wrap");
		self.handle(node)
	}

	/// Synchronizes `t` and returns its current raw value.
	pub fn unwrap(&mut self, t: &FunctionalTensor) -> Result<V> {
		self.entry();
		let node = self.node(t)?;
		self.sync_node(node)?;
		Ok(self.graph.inner(node)?.clone())
	}

	/// Applies every write pending on `t`'s family and regenerates `t`.
	pub fn synchronize(&mut self, t: &FunctionalTensor) -> Result<()> {
		self.entry();
		let node = self.node(t)?;
		self.sync_node(node)
	}

	/// True when `a` and `b` share an ultimate root.
	pub fn are_aliased(&self, a: &FunctionalTensor, b: &FunctionalTensor) -> Result<bool> {
		let (a, b) = (self.node(a)?, self.node(b)?);
		Ok(self.graph.are_aliased(a, b)?)
	}

	/// Reclaims records of dropped handles. Returns how many records were freed.
	pub fn collect(&mut self) -> usize {
		let dropped = std::mem::take(&mut *self.drops.borrow_mut());
		let freed = dropped.into_iter().map(|node| self.graph.release(node)).sum();
		if freed > 0 {
			tracing::trace!(freed, live = self.graph.len(), "functionalize.collect");
		}
		freed
	}

	fn entry(&mut self) {
		if self.config.collect == CollectPolicy::EveryCall {
			self.collect();
		}
	}

	fn handle(&self, node: NodeId) -> FunctionalTensor {
		FunctionalTensor::new(node, self.id, &self.drops)
	}

	/// Validates a handle against this session.
	fn node(&self, t: &FunctionalTensor) -> Result<NodeId> {
		if t.session() != self.id {
			return Err(InvalidState::ForeignTensor.into());
		}
		if !self.graph.contains(t.node()) {
			return Err(InvalidState::UnknownTensor.into());
		}
		Ok(t.node())
	}

	/// Current raw value of an operand; tracked operands are synchronized first.
	fn resolve(&mut self, operand: &Operand<V>) -> Result<V> {
		match operand {
			Operand::Plain(raw) => Ok(raw.clone()),
			Operand::Tracked(t) => {
				let node = self.node(t)?;
				self.sync_node(node)?;
				Ok(self.graph.inner(node)?.clone())
			}
		}
	}

	fn resolve_all(&mut self, operands: &[Operand<V>]) -> Result<Vec<V>> {
		operands.iter().map(|operand| self.resolve(operand)).collect()
	}

	fn emit(&mut self, op: &str, inputs: &[V], outputs: &Outputs<V>, scalars: &[Scalar]) {
		self.tracer.emit(op, inputs, outputs.as_slice(), scalars);
	}
}

impl<V: RawValue> Dispatch<V> for Functionalizer<V> {
	type Value = Operand<V>;
	type Error = FunctionalizeError;

	fn constant(&mut self, raw: V) -> Operand<V> {
		Operand::Plain(raw)
	}

	/// Shape of the value currently held. Unknown and foreign handles report an
	/// empty shape; the next call using them fails with [`InvalidState`].
	fn shape(&self, value: &Operand<V>) -> Vec<usize> {
		match value {
			Operand::Plain(raw) => raw.shape(),
			Operand::Tracked(t) => match self.node(t).and_then(|node| Ok(self.graph.inner(node)?.shape())) {
				Ok(shape) => shape,
				Err(err) => {
					tracing::warn!(node = t.node().index(), error = %err, "functionalize.shape_invalid");
					Vec::new()
				}
			},
		}
	}

	fn call(&mut self, op: &str, tensors: &[Operand<V>], scalars: &[Scalar]) -> Result<Outputs<Operand<V>>> {
		self.intercept(op, tensors, scalars)
	}
}

#[cfg(any(test, doc))]
pub(crate) mod invariants;
