use rustc_hash::{FxHashMap, FxHashSet};

use super::OpRegistry;
use crate::def::OpDef;
use crate::error::{RegistryError, Result};

/// Collects operation definitions and publishes them as an [`OpRegistry`].
pub struct RegistryBuilder<V> {
	label: &'static str,
	defs: Vec<OpDef<V>>,
	seen: FxHashSet<&'static str>,
}

impl<V> RegistryBuilder<V> {
	pub fn new(label: &'static str) -> Self {
		Self {
			label,
			defs: Vec::new(),
			seen: FxHashSet::default(),
		}
	}

	/// Adds one definition. A symbol may be registered once.
	pub fn register(&mut self, def: OpDef<V>) -> Result<()> {
		if !self.seen.insert(def.name) {
			return Err(RegistryError::DuplicateOp {
				registry: self.label,
				name: def.name,
			});
		}
		self.defs.push(def);
		Ok(())
	}

	/// Adds every definition, stopping at the first duplicate.
	pub fn extend(&mut self, defs: impl IntoIterator<Item = OpDef<V>>) -> Result<()> {
		defs.into_iter().try_for_each(|def| self.register(def))
	}

	pub fn len(&self) -> usize {
		self.defs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.defs.is_empty()
	}

	pub fn build(mut self) -> OpRegistry<V> {
		self.defs.sort_by(|a, b| a.name.cmp(b.name));
		let by_name: FxHashMap<_, _> = self
			.defs
			.iter()
			.enumerate()
			.map(|(idx, def)| (def.name, idx))
			.collect();
		tracing::debug!(registry = self.label, ops = self.defs.len(), "registry.build");
		OpRegistry {
			label: self.label,
			defs: self.defs,
			by_name,
		}
	}
}
