//! Observability hook for rewritten operations.
//!
//! The session reports every operation it issues against the registry
//! (functional forms, view replays, scatter steps) to an optional
//! [`TraceSink`]. Sinks observe only; they cannot influence the rewrite.

use core::fmt::{self, Write as _};
use std::cell::RefCell;
use std::rc::Rc;

use purify_registry::{RawValue, Scalar, ValueId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// One issued operation.
#[derive(Debug, Clone, Copy)]
pub struct OpRecord<'a, V> {
	pub op: &'a str,
	pub inputs: &'a [V],
	pub outputs: &'a [V],
	pub scalars: &'a [Scalar],
}

impl<V: RawValue> OpRecord<'_, V> {
	pub fn input_ids(&self) -> SmallVec<[ValueId; 4]> {
		self.inputs.iter().map(RawValue::id).collect()
	}

	pub fn output_ids(&self) -> SmallVec<[ValueId; 4]> {
		self.outputs.iter().map(RawValue::id).collect()
	}
}

/// Receiver of [`OpRecord`]s.
pub trait TraceSink<V> {
	fn record(&mut self, record: &OpRecord<'_, V>);
}

/// Forwards records to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl<V: RawValue> TraceSink<V> for LogSink {
	fn record(&mut self, record: &OpRecord<'_, V>) {
		tracing::debug!(
			op = record.op,
			inputs = ?record.input_ids(),
			outputs = ?record.output_ids(),
			scalars = record.scalars.len(),
			"functionalize.record"
		);
	}
}

/// Renders records as numbered assignments.
///
/// ```text
/// $1 = view($0, [4, 2])
/// $2 = add($1, tensor([[1., 1.], [1., 1.]]))
/// $3, $4 = split($2, 2)
/// ```
///
/// Outputs get the next free number. Inputs print as their number if seen
/// before (as an output, or via [`CaptureLog::log_input`]) and by value
/// otherwise. Clones share the same log.
#[derive(Clone, Default)]
pub struct CaptureLog {
	state: Rc<RefCell<LogState>>,
}

#[derive(Default)]
struct LogState {
	names: FxHashMap<ValueId, usize>,
	next: usize,
	lines: Vec<String>,
}

impl LogState {
	fn name(&mut self, id: ValueId) -> usize {
		let n = self.next;
		self.next += 1;
		self.names.insert(id, n);
		n
	}
}

impl CaptureLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Names `value` with the next number, typically `$0` for the program input.
	pub fn log_input<V: RawValue>(&self, value: &V) -> usize {
		self.state.borrow_mut().name(value.id())
	}

	pub fn lines(&self) -> Vec<String> {
		self.state.borrow().lines.clone()
	}

	/// Lines joined with `\n`.
	pub fn text(&self) -> String {
		self.state.borrow().lines.join("\n")
	}

	pub fn clear(&self) {
		self.state.borrow_mut().lines.clear();
	}
}

impl<V: RawValue + fmt::Display> TraceSink<V> for CaptureLog {
	fn record(&mut self, record: &OpRecord<'_, V>) {
		let mut state = self.state.borrow_mut();
		let mut args = Vec::with_capacity(record.inputs.len() + record.scalars.len());
		for input in record.inputs {
			match state.names.get(&input.id()) {
				Some(n) => args.push(format!("${n}")),
				None => args.push(input.to_string()),
			}
		}
		args.extend(record.scalars.iter().map(Scalar::to_string));

		let mut line = String::new();
		for (i, output) in record.outputs.iter().enumerate() {
			if i > 0 {
				line.push_str(", ");
			}
			let n = state.name(output.id());
			let _ = write!(line, "${n}");
		}
		let _ = write!(line, " = {}({})", record.op, args.join(", "));
		state.lines.push(line);
	}
}

impl fmt::Debug for CaptureLog {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CaptureLog")
			.field("lines", &self.state.borrow().lines.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use purify_registry::Outputs;
	use purify_tensor::{Tensor, builtin_registry};

	use super::*;

	#[test]
	fn test_capture_log_numbers_outputs() {
		let registry = builtin_registry().unwrap();
		let mut log = CaptureLog::new();
		let x = Tensor::ones(&[4, 2]);
		log.log_input(&x);

		let scalars = [Scalar::Int(2)];
		let Outputs::Multi(parts) = registry.run("split", &[x.clone()], &scalars).unwrap() else {
			panic!("split is multi-output");
		};
		log.record(&OpRecord {
			op: "split",
			inputs: std::slice::from_ref(&x),
			outputs: &parts,
			scalars: &scalars,
		});
		let tmp = Tensor::ones(&[2]);
		let sum = registry.run("add", &[parts[1].clone(), tmp.clone()], &[]).unwrap().into_vec();
		log.record(&OpRecord {
			op: "add",
			inputs: &[parts[1].clone(), tmp],
			outputs: &sum,
			scalars: &[],
		});

		assert_eq!(
			log.lines(),
			vec![
				"$1, $2 = split($0, 2)".to_string(),
				"$3 = add($2, tensor([1., 1.]))".to_string(),
			]
		);
	}

	#[test]
	fn test_clones_share_state() {
		let log = CaptureLog::new();
		let mut sink = log.clone();
		let x = Tensor::zeros(&[1]);
		TraceSink::<Tensor>::record(&mut sink, &OpRecord {
			op: "neg",
			inputs: std::slice::from_ref(&x),
			outputs: std::slice::from_ref(&x),
			scalars: &[],
		});
		assert_eq!(log.text(), "$0 = neg(tensor([0.]))");
	}
}
