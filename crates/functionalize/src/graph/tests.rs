use pretty_assertions::assert_eq;
use purify_registry::Scalar;

use super::*;

#[test]
fn test_views_start_current_and_go_stale_on_bump() {
	let mut graph = AliasGraph::new();
	let root = graph.insert_root(1i64);
	let a = graph.insert_view(root, 2, ViewMeta::single("view", &[])).unwrap();
	let b = graph.insert_view(a, 3, ViewMeta::single("diagonal", &[])).unwrap();
	assert!(graph.is_current(b).unwrap());

	graph.bump(root).unwrap();
	assert!(!graph.is_current(a).unwrap());
	assert!(!graph.is_current(b).unwrap());
	assert!(graph.is_current(root).unwrap());
}

#[test]
fn test_chain_is_nearest_first() {
	let mut graph = AliasGraph::new();
	let root = graph.insert_root(0i64);
	let a = graph.insert_view(root, 0, ViewMeta::single("view", &[])).unwrap();
	let b = graph.insert_view(a, 0, ViewMeta::single("select", &[Scalar::Int(0), Scalar::Int(1)])).unwrap();
	assert_eq!(graph.chain(b).unwrap().as_slice(), &[b, a]);
	assert_eq!(graph.chain(root).unwrap().as_slice(), &[] as &[NodeId]);
	assert_eq!(graph.root_of(b).unwrap(), root);
}

#[test]
fn test_aliasing_is_by_root() {
	let mut graph = AliasGraph::new();
	let x = graph.insert_root(0i64);
	let y = graph.insert_view(x, 0, ViewMeta::single("view", &[])).unwrap();
	let z = graph.insert_view(x, 0, ViewMeta::single("view", &[])).unwrap();
	let other = graph.insert_root(0);
	assert!(graph.are_aliased(y, z).unwrap());
	assert!(graph.are_aliased(y, x).unwrap());
	assert!(graph.are_aliased(x, x).unwrap());
	assert!(!graph.are_aliased(y, other).unwrap());
}

#[test]
fn test_rehome_root_moves_queue_and_generation() {
	let mut graph = AliasGraph::new();
	let x = graph.insert_root(0i64);
	let y = graph.insert_view(x, 1, ViewMeta::single("view", &[])).unwrap();
	graph.bump(x).unwrap();
	graph.enqueue_write(x, y).unwrap();

	let anon = graph.rehome(x, ViewMeta::single("transpose", &[Scalar::Int(0), Scalar::Int(1)]), 9).unwrap();
	assert_eq!(graph.root_of(x).unwrap(), anon);
	assert_eq!(graph.base(y).unwrap(), Some(anon));
	assert_eq!(*graph.inner(anon).unwrap(), 0);
	assert_eq!(*graph.inner(x).unwrap(), 9);
	assert_eq!(graph.version(anon).unwrap(), 1);
	assert_eq!(graph.queued_writes(anon).unwrap(), 1);
	assert_eq!(graph.queued_writes(x).unwrap(), 0);
	assert!(graph.is_current(x).unwrap());
}

#[test]
fn test_unknown_handle_is_invalid_state() {
	let mut graph = AliasGraph::new();
	let x = graph.insert_root(0i64);
	assert_eq!(graph.release(x), 1);
	assert!(!graph.contains(x));
	assert_eq!(graph.root_of(x), Err(InvalidState::UnknownTensor));
	assert_eq!(graph.release(x), 0);
}
