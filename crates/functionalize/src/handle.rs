use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::graph::NodeId;

/// Identity of a [`Functionalizer`](crate::Functionalizer), used to reject
/// handles from another session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

static NEXT_SESSION: AtomicU64 = AtomicU64::new(0);

impl SessionId {
	pub(crate) fn next() -> Self {
		Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
	}
}

/// Handles released since the last collection.
pub(crate) type DropQueue = Rc<RefCell<Vec<NodeId>>>;

/// User-facing handle to an alias-graph record.
///
/// Cloning yields the same tensor. When the last clone drops, the record's
/// handle reference is queued for release; the graph reclaims it at the next
/// collection point.
#[derive(Clone)]
pub struct FunctionalTensor {
	node: NodeId,
	session: SessionId,
	_live: Rc<Liveness>,
}

struct Liveness {
	node: NodeId,
	drops: DropQueue,
}

impl Drop for Liveness {
	fn drop(&mut self) {
		self.drops.borrow_mut().push(self.node);
	}
}

impl FunctionalTensor {
	pub(crate) fn new(node: NodeId, session: SessionId, drops: &DropQueue) -> Self {
		Self {
			node,
			session,
			_live: Rc::new(Liveness {
				node,
				drops: Rc::clone(drops),
			}),
		}
	}

	pub fn node(&self) -> NodeId {
		self.node
	}

	pub fn session(&self) -> SessionId {
		self.session
	}

	/// True when both handles name the same tensor.
	pub fn same(&self, other: &FunctionalTensor) -> bool {
		self.session == other.session && self.node == other.node
	}
}

impl core::fmt::Debug for FunctionalTensor {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("FunctionalTensor")
			.field("node", &self.node.index())
			.field("session", &self.session.0)
			.finish()
	}
}

/// A value as seen by a program running under a session.
#[derive(Debug, Clone)]
pub enum Operand<V> {
	/// Wrapped: every operation on it is rewritten.
	Tracked(FunctionalTensor),
	/// Unwrapped: operations touching only plain values run directly.
	Plain(V),
}

impl<V> Operand<V> {
	pub fn tracked(&self) -> Option<&FunctionalTensor> {
		match self {
			Self::Tracked(t) => Some(t),
			Self::Plain(_) => None,
		}
	}

	pub fn plain(&self) -> Option<&V> {
		match self {
			Self::Plain(v) => Some(v),
			Self::Tracked(_) => None,
		}
	}

	pub fn is_tracked(&self) -> bool {
		matches!(self, Self::Tracked(_))
	}
}

impl<V> From<FunctionalTensor> for Operand<V> {
	fn from(t: FunctionalTensor) -> Self {
		Self::Tracked(t)
	}
}
