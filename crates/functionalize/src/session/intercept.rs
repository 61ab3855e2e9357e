use std::sync::Arc;

use purify_registry::{KernelError, OpDef, OpKind, OpRegistry, Outputs, RawValue, Scalar, invoke};

use super::Functionalizer;
use crate::config::FlushPolicy;
use crate::error::{FunctionalizeError, InvalidState, Result, UnsupportedReason};
use crate::graph::{NodeId, ViewMeta};
use crate::handle::Operand;
use crate::mode;

/// Kind a mutating definition's counterpart must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counterpart {
	/// Pure op, for in-place and copy-into definitions.
	Pure,
	/// View op with a registered scatter, for in-place view definitions.
	View,
}

impl Counterpart {
	fn label(self) -> &'static str {
		match self {
			Self::Pure => "pure",
			Self::View => "view",
		}
	}

	fn accepts<V>(self, kind: &OpKind<V>) -> bool {
		match self {
			Self::Pure => kind.is_pure(),
			Self::View => kind.is_view(),
		}
	}
}

/// Resolves the counterpart a mutating definition names and checks its kind.
fn counterpart<'r, V>(
	registry: &'r OpRegistry<V>,
	def: &OpDef<V>,
	name: &'static str,
	expected: Counterpart,
) -> Result<&'r OpDef<V>> {
	let Some(other) = registry.get(name) else {
		return Err(FunctionalizeError::unsupported(def.name, UnsupportedReason::MissingCounterpart(name)));
	};
	if !expected.accepts(&other.kind) {
		return Err(FunctionalizeError::unsupported(
			def.name,
			UnsupportedReason::CounterpartKind {
				counterpart: name,
				expected: expected.label(),
			},
		));
	}
	if expected == Counterpart::View && other.scatter().is_none() {
		return Err(FunctionalizeError::unsupported(other.name, UnsupportedReason::MissingScatter));
	}
	Ok(other)
}

fn first<'a, V>(def: &OpDef<V>, operands: &'a [Operand<V>]) -> Result<&'a Operand<V>> {
	operands
		.first()
		.ok_or_else(|| KernelError::invalid(def.name, "missing tensor operand").into())
}

fn only<V>(def: &OpDef<V>, out: Outputs<V>) -> Result<V> {
	let actual = out.len();
	out.single().ok_or_else(|| {
		KernelError::Arity {
			op: def.name.to_string(),
			expected: "single".to_string(),
			actual,
		}
		.into()
	})
}

impl<V: RawValue> Functionalizer<V> {
	/// Classifies one call and issues its functional rewrite.
	pub(super) fn intercept(
		&mut self,
		op: &str,
		operands: &[Operand<V>],
		scalars: &[Scalar],
	) -> Result<Outputs<Operand<V>>> {
		self.entry();
		if !operands.iter().any(Operand::is_tracked) {
			let raw: Vec<V> = operands.iter().filter_map(|o| o.plain().cloned()).collect();
			let out = self.registry.run(op, &raw, scalars)?;
			return Ok(out.map(Operand::Plain));
		}
		if !mode::is_enabled() {
			return Err(InvalidState::TrackedWhileDisabled.into());
		}

		let registry = Arc::clone(&self.registry);
		let def = registry.lookup(op)?;
		tracing::trace!(op = def.name, kind = def.kind.label(), "functionalize.intercept");
		match def.kind {
			OpKind::Pure => self.rewrite_pure(def, operands, scalars),
			OpKind::View { scatter } => {
				if scatter.is_none() {
					return Err(FunctionalizeError::unsupported(def.name, UnsupportedReason::MissingScatter));
				}
				self.rewrite_view(def, operands, scalars)
			}
			OpKind::InPlace { functional } => {
				let functional = counterpart(&registry, def, functional, Counterpart::Pure)?;
				self.rewrite_in_place(def, functional, operands, scalars)
			}
			OpKind::InPlaceView { functional } => {
				let functional = counterpart(&registry, def, functional, Counterpart::View)?;
				self.rewrite_in_place_view(def, functional, operands, scalars)
			}
			OpKind::CopyInto { substitute } => {
				let substitute = counterpart(&registry, def, substitute, Counterpart::Pure)?;
				self.rewrite_copy(def, substitute, operands, scalars)
			}
		}
	}

	/// Fresh outputs become new roots.
	fn rewrite_pure(
		&mut self,
		def: &OpDef<V>,
		operands: &[Operand<V>],
		scalars: &[Scalar],
	) -> Result<Outputs<Operand<V>>> {
		let inputs = self.resolve_all(operands)?;
		let out = invoke(def, &inputs, scalars)?;
		self.emit(def.name, &inputs, &out, scalars);
		Ok(out.map(|raw| {
			let node = self.graph.insert_root(raw);
			Operand::Tracked(self.handle(node))
		}))
	}

	/// Outputs are linked to the source record with the call that produced them.
	fn rewrite_view(
		&mut self,
		def: &OpDef<V>,
		operands: &[Operand<V>],
		scalars: &[Scalar],
	) -> Result<Outputs<Operand<V>>> {
		let base = match first(def, operands)? {
			Operand::Tracked(t) => self.node(t)?,
			Operand::Plain(_) => {
				let inputs = self.resolve_all(operands)?;
				let out = invoke(def, &inputs, scalars)?;
				self.emit(def.name, &inputs, &out, scalars);
				return Ok(out.map(Operand::Plain));
			}
		};
		let inputs = self.resolve_all(operands)?;
		let out = invoke(def, &inputs, scalars)?;
		self.emit(def.name, &inputs, &out, scalars);

		let outputs = out.len();
		let mut output_index = 0;
		out.try_map(|raw| -> Result<Operand<V>> {
			let meta = ViewMeta {
				op: def.name,
				scalars: scalars.into(),
				output_index,
				outputs,
			};
			output_index += 1;
			let node = self.graph.insert_view(base, raw, meta)?;
			Ok(Operand::Tracked(self.handle(node)))
		})
	}

	/// `op_(t, ..)` becomes `t <- functional(t, ..)`.
	pub(super) fn rewrite_in_place(
		&mut self,
		def: &OpDef<V>,
		functional: &OpDef<V>,
		operands: &[Operand<V>],
		scalars: &[Scalar],
	) -> Result<Outputs<Operand<V>>> {
		let target = first(def, operands)?.clone();
		let Operand::Tracked(t) = &target else {
			self.run_direct(def, operands, scalars)?;
			return Ok(Outputs::Single(target));
		};
		let node = self.node(t)?;
		let inputs = self.resolve_all(operands)?;
		let out = invoke(functional, &inputs, scalars)?;
		self.emit(functional.name, &inputs, &out, scalars);
		let value = only(functional, out)?;

		let expected = self.graph.inner(node)?.shape();
		let actual = value.shape();
		if expected != actual {
			return Err(KernelError::ShapeMismatch {
				op: def.name,
				left: expected,
				right: actual,
			}
			.into());
		}
		self.commit(node, value)?;
		Ok(Outputs::Single(target))
	}

	/// `op_(t, ..)` turns `t` into `functional(old t, ..)`, aliasing its old self.
	fn rewrite_in_place_view(
		&mut self,
		def: &OpDef<V>,
		functional: &OpDef<V>,
		operands: &[Operand<V>],
		scalars: &[Scalar],
	) -> Result<Outputs<Operand<V>>> {
		let target = first(def, operands)?.clone();
		let Operand::Tracked(t) = &target else {
			self.run_direct(def, operands, scalars)?;
			return Ok(Outputs::Single(target));
		};
		let node = self.node(t)?;
		let inputs = self.resolve_all(operands)?;
		let out = invoke(functional, &inputs, scalars)?;
		self.emit(functional.name, &inputs, &out, scalars);
		let value = only(functional, out)?;

		let meta = ViewMeta::single(functional.name, scalars);
		let record = self.graph.get(node)?;
		if record.base.is_none() || !self.graph.children(node).is_empty() {
			let anon = self.graph.rehome(node, meta, value)?;
			tracing::trace!(node = node.index(), anon = anon.index(), op = def.name, "functionalize.rehome");
		} else {
			let record = self.graph.get_mut(node)?;
			record.metas.push(meta);
			record.inner = value;
		}
		Ok(Outputs::Single(target))
	}

	/// `copy_(dst, src)` becomes `dst <- substitute(src, dst.shape)`.
	pub(super) fn rewrite_copy(
		&mut self,
		def: &OpDef<V>,
		substitute: &OpDef<V>,
		operands: &[Operand<V>],
		scalars: &[Scalar],
	) -> Result<Outputs<Operand<V>>> {
		let [dst, src, ..] = operands else {
			return Err(KernelError::invalid(def.name, "expected destination and source tensors").into());
		};
		let dst_raw = self.resolve(dst)?;
		let src_raw = self.resolve(src)?;
		let shape = [Scalar::dims(def.name, &dst_raw.shape())?];
		let inputs = [src_raw];
		let out = invoke(substitute, &inputs, &shape)?;
		self.emit(substitute.name, &inputs, &out, &shape);
		let value = only(substitute, out)?;

		match dst {
			Operand::Tracked(t) => {
				let node = self.node(t)?;
				self.commit(node, value)?;
			}
			Operand::Plain(_) => {
				invoke(def, &[dst_raw, value], scalars)?;
			}
		}
		Ok(Outputs::Single(dst.clone()))
	}

	/// Runs a mutating kernel on plain values, outside the graph.
	fn run_direct(&mut self, def: &OpDef<V>, operands: &[Operand<V>], scalars: &[Scalar]) -> Result<()> {
		let inputs = self.resolve_all(operands)?;
		invoke(def, &inputs, scalars)?;
		Ok(())
	}

	/// Makes `value` the new contents of `node`.
	///
	/// A root takes the value directly. A view keeps it as its pending write,
	/// queued on the root for the next flush, and stays stale: its next read
	/// regenerates it from the root so it carries the layout the view call
	/// produces, not the layout of the functional result.
	pub(super) fn commit(&mut self, node: NodeId, value: V) -> Result<()> {
		let root = self.graph.root_of(node)?;
		let version = self.graph.bump(root)?;
		let record = self.graph.get_mut(node)?;
		if node == root {
			record.version = version;
			record.inner = value;
			tracing::trace!(node = node.index(), version, "functionalize.commit");
			return Ok(());
		}
		record.pending = Some(value);
		self.graph.enqueue_write(root, node)?;
		tracing::trace!(node = node.index(), root = root.index(), version, "functionalize.enqueue");
		if self.config.flush == FlushPolicy::Eager {
			self.flush(root)?;
		}
		Ok(())
	}
}
