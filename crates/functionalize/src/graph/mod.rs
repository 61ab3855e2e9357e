#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Alias graph.
//!
//! # Purpose
//!
//! Arena of functional tensor records. Each record owns the raw value the
//! session currently holds for one wrapped tensor, and, for views, the handle
//! of the record it was taken from plus the exact calls that regenerate it.
//!
//! # Mental Model
//!
//! - A **root** has no base. It holds the ground truth for its whole family and,
//!   as the family's generation counter, a `version` bumped by every mutation of
//!   any member.
//! - A **view** records `base` and a chain of [`ViewMeta`] (normally one entry;
//!   in-place view ops append). It is current iff its `version` equals its
//!   root's.
//! - A write through a view sets the view's `pending` value and appends the view
//!   to its root's write queue. Flushing applies queued writes to the root in
//!   issue order.
//!
//! Handles are integer [`NodeId`]s into a `slab`. Records are reference counted:
//! one count for a live user handle, one per child view, one per queued write.
//!
//! # Invariants
//!
//! - Roots carry no view metadata and views carry at least one [`ViewMeta`].
//!   - Enforced in: [`AliasGraph::insert_root`], [`AliasGraph::insert_view`], [`AliasGraph::rehome`].
//!   - Tested by: [`crate::graph::invariants::test_roots_have_no_metas`]
//!   - Failure symptom: a root is "regenerated" from nothing, or a view cannot be replayed.
//!
//! - Following `base` from any record terminates at a root; every base was created
//!   before its views (`seq` strictly increases along a chain).
//!   - Enforced in: [`AliasGraph::insert_view`], [`AliasGraph::rehome`].
//!   - Tested by: [`crate::graph::invariants::test_bases_precede_views`]
//!   - Failure symptom: `root_of` loops or lands on a freed slot.
//!
//! - A record stays allocated while a handle, a child view or a queued write
//!   refers to it.
//!   - Enforced in: [`AliasGraph::release`], [`AliasGraph::enqueue_write`].
//!   - Tested by: [`crate::graph::invariants::test_released_only_when_unreferenced`]
//!   - Failure symptom: flushing a write walks into a reused slot.
//!
//! - A record appears at most once in its root's write queue; a newer write
//!   moves it to the back.
//!   - Enforced in: [`AliasGraph::enqueue_write`].
//!   - Tested by: [`crate::graph::invariants::test_newer_write_supersedes`]
//!   - Failure symptom: an old value is scattered after a newer one, undoing it.

use std::collections::VecDeque;

use purify_registry::Scalar;
use slab::Slab;
use smallvec::SmallVec;

use crate::error::InvalidState;

/// Handle of an alias-graph record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
	pub fn index(self) -> usize {
		self.0
	}
}

/// One replayable view call.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewMeta {
	/// View op symbol.
	pub op: &'static str,
	/// Scalars the view was issued with.
	pub scalars: SmallVec<[Scalar; 4]>,
	/// Which result this record is, for multi-output views.
	pub output_index: usize,
	/// How many results the call produced.
	pub outputs: usize,
}

impl ViewMeta {
	pub fn single(op: &'static str, scalars: &[Scalar]) -> Self {
		Self {
			op,
			scalars: scalars.into(),
			output_index: 0,
			outputs: 1,
		}
	}
}

pub(crate) struct Record<V> {
	pub(crate) inner: V,
	pub(crate) base: Option<NodeId>,
	pub(crate) metas: SmallVec<[ViewMeta; 1]>,
	pub(crate) pending: Option<V>,
	pub(crate) version: u64,
	refs: usize,
	seq: u64,
	queue: VecDeque<NodeId>,
}

/// Arena of functional tensor records.
pub struct AliasGraph<V> {
	nodes: Slab<Record<V>>,
	next_seq: u64,
}

impl<V> Default for AliasGraph<V> {
	fn default() -> Self {
		Self {
			nodes: Slab::new(),
			next_seq: 0,
		}
	}
}

type GraphResult<T> = Result<T, InvalidState>;

impl<V> AliasGraph<V> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.contains(id.0)
	}

	fn seq(&mut self) -> u64 {
		self.next_seq += 1;
		self.next_seq
	}

	pub(crate) fn get(&self, id: NodeId) -> GraphResult<&Record<V>> {
		self.nodes.get(id.0).ok_or(InvalidState::UnknownTensor)
	}

	pub(crate) fn get_mut(&mut self, id: NodeId) -> GraphResult<&mut Record<V>> {
		self.nodes.get_mut(id.0).ok_or(InvalidState::UnknownTensor)
	}

	/// Current raw value held for `id`, possibly stale.
	pub fn inner(&self, id: NodeId) -> GraphResult<&V> {
		Ok(&self.get(id)?.inner)
	}

	pub fn base(&self, id: NodeId) -> GraphResult<Option<NodeId>> {
		Ok(self.get(id)?.base)
	}

	pub fn metas(&self, id: NodeId) -> GraphResult<&[ViewMeta]> {
		Ok(&self.get(id)?.metas)
	}

	pub fn version(&self, id: NodeId) -> GraphResult<u64> {
		Ok(self.get(id)?.version)
	}

	pub fn has_pending(&self, id: NodeId) -> GraphResult<bool> {
		Ok(self.get(id)?.pending.is_some())
	}

	/// Registers a fresh root holding one handle reference.
	pub(crate) fn insert_root(&mut self, inner: V) -> NodeId {
		let seq = self.seq();
		NodeId(self.nodes.insert(Record {
			inner,
			base: None,
			metas: SmallVec::new(),
			pending: None,
			version: 0,
			refs: 1,
			seq,
			queue: VecDeque::new(),
		}))
	}

	/// Registers a view of `base`, current as of the family's generation.
	pub(crate) fn insert_view(&mut self, base: NodeId, inner: V, meta: ViewMeta) -> GraphResult<NodeId> {
		let root = self.root_of(base)?;
		let version = self.get(root)?.version;
		self.get_mut(base)?.refs += 1;
		let seq = self.seq();
		Ok(NodeId(self.nodes.insert(Record {
			inner,
			base: Some(base),
			metas: SmallVec::from_buf([meta]),
			pending: None,
			version,
			refs: 1,
			seq,
			queue: VecDeque::new(),
		})))
	}

	/// Follows `base` links to the root.
	pub fn root_of(&self, id: NodeId) -> GraphResult<NodeId> {
		let mut current = id;
		while let Some(base) = self.get(current)?.base {
			current = base;
		}
		Ok(current)
	}

	/// Number of `base` links between `id` and its root.
	pub fn depth(&self, id: NodeId) -> GraphResult<usize> {
		Ok(self.chain(id)?.len())
	}

	/// `id` followed by each ancestor below the root, nearest first.
	pub fn chain(&self, id: NodeId) -> GraphResult<SmallVec<[NodeId; 4]>> {
		let mut chain = SmallVec::new();
		let mut current = id;
		while let Some(base) = self.get(current)?.base {
			chain.push(current);
			current = base;
		}
		Ok(chain)
	}

	/// Same ultimate root.
	pub fn are_aliased(&self, a: NodeId, b: NodeId) -> GraphResult<bool> {
		Ok(self.root_of(a)? == self.root_of(b)?)
	}

	/// True when `id` is current with respect to its family.
	pub fn is_current(&self, id: NodeId) -> GraphResult<bool> {
		let root = self.root_of(id)?;
		Ok(self.get(id)?.version == self.get(root)?.version)
	}

	/// Records whose base is `id`.
	pub fn children(&self, id: NodeId) -> Vec<NodeId> {
		self.nodes
			.iter()
			.filter(|(_, record)| record.base == Some(id))
			.map(|(key, _)| NodeId(key))
			.collect()
	}

	/// Bumps the family generation; every other member becomes stale.
	pub(crate) fn bump(&mut self, root: NodeId) -> GraphResult<u64> {
		let record = self.get_mut(root)?;
		record.version += 1;
		Ok(record.version)
	}

	/// Queues `view`'s pending write on `root`, superseding an earlier unflushed one.
	pub(crate) fn enqueue_write(&mut self, root: NodeId, view: NodeId) -> GraphResult<()> {
		let queue = &mut self.get_mut(root)?.queue;
		if let Some(pos) = queue.iter().position(|&queued| queued == view) {
			queue.remove(pos);
			queue.push_back(view);
			return Ok(());
		}
		queue.push_back(view);
		self.get_mut(view)?.refs += 1;
		Ok(())
	}

	/// Next queued write on `root`; the caller owns its queue reference.
	pub(crate) fn pop_write(&mut self, root: NodeId) -> GraphResult<Option<NodeId>> {
		Ok(self.get_mut(root)?.queue.pop_front())
	}

	pub fn queued_writes(&self, root: NodeId) -> GraphResult<usize> {
		Ok(self.get(root)?.queue.len())
	}

	/// Drops one reference, freeing the record (and transitively its bases)
	/// once nothing refers to it. Returns how many records were freed.
	pub(crate) fn release(&mut self, id: NodeId) -> usize {
		let mut freed = 0;
		let mut next = Some(id);
		while let Some(id) = next.take() {
			let Some(record) = self.nodes.get_mut(id.0) else {
				tracing::warn!(node = id.0, "functionalize.graph.release_unknown");
				break;
			};
			record.refs = record.refs.saturating_sub(1);
			if record.refs > 0 {
				break;
			}
			let record = self.nodes.remove(id.0);
			freed += 1;
			next = record.base;
		}
		freed
	}

	/// Moves `id`'s current identity into a new anonymous record and makes
	/// `id` a view of it through `meta`.
	///
	/// Existing children of `id` are re-based onto the anonymous record so they
	/// keep resolving against the value they were taken from. If `id` was a
	/// root, the anonymous record becomes the family root and inherits the
	/// generation counter and write queue. `id` must have no pending write.
	pub(crate) fn rehome(&mut self, id: NodeId, meta: ViewMeta, inner: V) -> GraphResult<NodeId> {
		let children = self.children(id);
		let anon_seq = self.get(id)?.seq;
		let new_seq = self.seq();
		let record = self.get_mut(id)?;
		let old_inner = std::mem::replace(&mut record.inner, inner);
		let anon = Record {
			inner: old_inner,
			base: record.base,
			metas: std::mem::replace(&mut record.metas, SmallVec::from_buf([meta])),
			pending: None,
			version: record.version,
			refs: children.len() + 1,
			seq: anon_seq,
			queue: std::mem::take(&mut record.queue),
		};
		record.refs = record.refs.saturating_sub(children.len());
		record.seq = new_seq;
		let anon = NodeId(self.nodes.insert(anon));
		for child in children {
			self.get_mut(child)?.base = Some(anon);
		}
		self.get_mut(id)?.base = Some(anon);
		tracing::trace!(node = id.0, anon = anon.0, "functionalize.graph.rehome");
		Ok(anon)
	}

	/// Every live handle, for consistency checks.
	pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.nodes.iter().map(|(key, _)| NodeId(key))
	}

	#[cfg(any(test, doc))]
	pub(crate) fn refs(&self, id: NodeId) -> GraphResult<usize> {
		Ok(self.get(id)?.refs)
	}

	#[cfg(any(test, doc))]
	pub(crate) fn seq_of(&self, id: NodeId) -> GraphResult<u64> {
		Ok(self.get(id)?.seq)
	}
}

#[cfg(any(test, doc))]
pub(crate) mod invariants;

#[cfg(test)]
mod tests;
