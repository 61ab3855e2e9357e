#![allow(dead_code)]

use purify_registry::Scalar;

use super::{AliasGraph, NodeId, ViewMeta};

fn meta(op: &'static str) -> ViewMeta {
	ViewMeta::single(op, &[Scalar::Int(0)])
}

/// Root, view of root, view of view.
fn family() -> (AliasGraph<i64>, NodeId, NodeId, NodeId) {
	let mut graph = AliasGraph::new();
	let root = graph.insert_root(10);
	let view = graph.insert_view(root, 11, meta("view")).unwrap();
	let leaf = graph.insert_view(view, 12, meta("diagonal")).unwrap();
	(graph, root, view, leaf)
}

/// Invariant: roots MUST carry no view metadata; views MUST carry at least one entry.
pub(crate) fn inv_roots_have_no_metas() {
	let (mut graph, root, view, _) = family();
	assert!(graph.metas(root).unwrap().is_empty());
	assert_eq!(graph.metas(view).unwrap().len(), 1);

	let anon = graph.rehome(root, meta("transpose"), 20).unwrap();
	assert!(graph.metas(anon).unwrap().is_empty(), "anonymous root inherits no metas");
	assert_eq!(graph.metas(root).unwrap()[0].op, "transpose");
	assert_eq!(graph.base(root).unwrap(), Some(anon));
}

#[cfg_attr(test, test)]
pub(crate) fn test_roots_have_no_metas() {
	inv_roots_have_no_metas()
}

/// Invariant: every base MUST be older than its views, so `root_of` terminates.
pub(crate) fn inv_bases_precede_views() {
	let (mut graph, root, view, leaf) = family();
	graph.rehome(view, meta("transpose"), 30).unwrap();
	graph.rehome(root, meta("unsqueeze"), 40).unwrap();

	for id in graph.ids().collect::<Vec<_>>() {
		if let Some(base) = graph.base(id).unwrap() {
			assert!(
				graph.seq_of(base).unwrap() < graph.seq_of(id).unwrap(),
				"{base:?} is not older than {id:?}"
			);
		}
	}
	let top = graph.root_of(leaf).unwrap();
	assert_eq!(graph.base(top).unwrap(), None);
	assert_eq!(graph.depth(leaf).unwrap(), 2);
}

#[cfg_attr(test, test)]
pub(crate) fn test_bases_precede_views() {
	inv_bases_precede_views()
}

/// Invariant: a record MUST stay allocated while a handle, child or queued write refers to it.
pub(crate) fn inv_released_only_when_unreferenced() {
	let (mut graph, root, view, leaf) = family();
	graph.enqueue_write(root, leaf).unwrap();

	assert_eq!(graph.release(root), 0, "view still refers to root");
	assert_eq!(graph.release(view), 0, "leaf still refers to view");
	assert_eq!(graph.release(leaf), 0, "queued write still refers to leaf");
	assert_eq!(graph.len(), 3);

	let popped = graph.pop_write(root).unwrap();
	assert_eq!(popped, Some(leaf));
	assert_eq!(graph.release(leaf), 3, "freeing leaf cascades to its bases");
	assert!(graph.is_empty());
}

#[cfg_attr(test, test)]
pub(crate) fn test_released_only_when_unreferenced() {
	inv_released_only_when_unreferenced()
}

/// Invariant: a record MUST appear at most once in its root's write queue.
pub(crate) fn inv_newer_write_supersedes() {
	let (mut graph, root, view, leaf) = family();
	graph.enqueue_write(root, leaf).unwrap();
	graph.enqueue_write(root, view).unwrap();
	graph.enqueue_write(root, leaf).unwrap();

	assert_eq!(graph.queued_writes(root).unwrap(), 2);
	assert_eq!(graph.refs(leaf).unwrap(), 2, "handle plus one queue entry");
	assert_eq!(graph.pop_write(root).unwrap(), Some(view));
	assert_eq!(graph.pop_write(root).unwrap(), Some(leaf));
	assert_eq!(graph.pop_write(root).unwrap(), None);
}

#[cfg_attr(test, test)]
pub(crate) fn test_newer_write_supersedes() {
	inv_newer_write_supersedes()
}
