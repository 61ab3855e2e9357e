use std::sync::Arc;

use purify_registry::{RawValue, invoke};
use smallvec::SmallVec;

use super::Functionalizer;
use crate::error::{FunctionalizeError, Result, UnsupportedReason};
use crate::graph::{NodeId, ViewMeta};

impl<V: RawValue> Functionalizer<V> {
	/// Flushes the family's queued writes, then brings `node` up to date.
	pub(super) fn sync_node(&mut self, node: NodeId) -> Result<()> {
		let root = self.graph.root_of(node)?;
		self.flush(root)?;
		self.regenerate(node)
	}

	/// Replays `node`'s view chain from its (regenerated) base.
	fn regenerate(&mut self, node: NodeId) -> Result<()> {
		let root = self.graph.root_of(node)?;
		let version = self.graph.version(root)?;
		let record = self.graph.get(node)?;
		if node == root || record.version == version {
			return Ok(());
		}
		let Some(base) = record.base else {
			return Ok(());
		};
		let metas = record.metas.clone();
		self.regenerate(base)?;

		let mut value = self.graph.inner(base)?.clone();
		for meta in &metas {
			value = self.replay(meta, value)?;
		}
		let record = self.graph.get_mut(node)?;
		record.inner = value;
		record.version = version;
		tracing::trace!(node = node.index(), version, "functionalize.regenerate");
		Ok(())
	}

	/// Applies every queued write on `root`, oldest first.
	///
	/// Each write recomputes the views between the root and the written record
	/// from the root's current value, then scatters the pending value back up
	/// the chain. The generation counter is left alone: it was bumped when the
	/// write was issued, so the written record itself is regenerated from the
	/// root on its next read.
	pub(super) fn flush(&mut self, root: NodeId) -> Result<()> {
		while let Some(node) = self.graph.pop_write(root)? {
			let result = self.apply_write(root, node);
			self.graph.release(node);
			result?;
		}
		Ok(())
	}

	fn apply_write(&mut self, root: NodeId, node: NodeId) -> Result<()> {
		let Some(pending) = self.graph.get_mut(node)?.pending.take() else {
			return Ok(());
		};
		let chain = self.graph.chain(node)?;

		// Every view call from the root down to `node`, root side first.
		let mut metas: SmallVec<[ViewMeta; 4]> = SmallVec::new();
		for &member in chain.iter().rev() {
			metas.extend(self.graph.metas(member)?.iter().cloned());
		}
		let Some(last) = metas.pop() else {
			return Ok(());
		};

		// (meta, the value it was applied to).
		let mut steps: SmallVec<[(ViewMeta, V); 4]> = SmallVec::new();
		let mut current = self.graph.inner(root)?.clone();
		for meta in metas {
			let next = self.replay(&meta, current.clone())?;
			steps.push((meta, current));
			current = next;
		}
		steps.push((last, current));

		let mut update = pending;
		for (meta, base) in steps.iter().rev() {
			update = self.scatter(meta, base, update)?;
		}
		self.graph.get_mut(root)?.inner = update;
		tracing::trace!(root = root.index(), node = node.index(), depth = chain.len(), "functionalize.flush");
		Ok(())
	}

	/// Re-issues one recorded view call against `input`.
	fn replay(&mut self, meta: &ViewMeta, input: V) -> Result<V> {
		let registry = Arc::clone(&self.registry);
		let def = registry.lookup(meta.op)?;
		let inputs = [input];
		let out = invoke(def, &inputs, &meta.scalars)?;
		self.emit(def.name, &inputs, &out, &meta.scalars);
		if out.len() != meta.outputs {
			return Err(FunctionalizeError::AliasInconsistency {
				op: meta.op,
				expected: meta.outputs,
				actual: out.len(),
			});
		}
		let actual = out.len();
		out.into_vec()
			.into_iter()
			.nth(meta.output_index)
			.ok_or(FunctionalizeError::AliasInconsistency {
				op: meta.op,
				expected: meta.output_index + 1,
				actual,
			})
	}

	/// Writes `update` back into `base` through the inverse of `meta`.
	fn scatter(&mut self, meta: &ViewMeta, base: &V, update: V) -> Result<V> {
		let registry = Arc::clone(&self.registry);
		let def = registry.lookup(meta.op)?;
		let Some(build) = def.scatter() else {
			return Err(FunctionalizeError::unsupported(meta.op, UnsupportedReason::MissingScatter));
		};
		let plan = build(base, &meta.scalars, meta.output_index)?;
		let tracer = &mut self.tracer;
		let value = registry.run_scatter(&plan, base, update, |op, inputs, output, scalars| {
			tracer.emit(op, inputs, std::slice::from_ref(output), scalars);
		})?;
		Ok(value)
	}
}
