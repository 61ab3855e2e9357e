use core::fmt;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

use purify_registry::{KernelError, KernelResult, RawValue, ValueId};

use crate::layout::Layout;

type Storage = Rc<RefCell<Vec<f32>>>;

/// A strided `f32` array object.
///
/// Cloning the handle yields the *same* object: same [`ValueId`], same layout
/// cell, same storage. Views are distinct objects over shared storage, so a
/// write through any of them is visible through all of them.
#[derive(Clone)]
pub struct Tensor(Rc<TensorObject>);

struct TensorObject {
	id: ValueId,
	layout: RefCell<Layout>,
	storage: Storage,
}

impl Tensor {
	fn from_parts(layout: Layout, storage: Storage) -> Self {
		Self(Rc::new(TensorObject {
			id: ValueId::next(),
			layout: RefCell::new(layout),
			storage,
		}))
	}

	/// Creates a contiguous tensor, checking `data` against `shape`.
	pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> KernelResult<Self> {
		let layout = Layout::contiguous(shape);
		if layout.numel() != data.len() {
			return Err(KernelError::ShapeMismatch {
				op: "from_vec",
				left: vec![data.len()],
				right: shape.to_vec(),
			});
		}
		Ok(Self::from_parts(layout, Rc::new(RefCell::new(data))))
	}

	pub fn full(shape: &[usize], value: f32) -> Self {
		let layout = Layout::contiguous(shape);
		let data = vec![value; layout.numel()];
		Self::from_parts(layout, Rc::new(RefCell::new(data)))
	}

	pub fn zeros(shape: &[usize]) -> Self {
		Self::full(shape, 0.0)
	}

	pub fn ones(shape: &[usize]) -> Self {
		Self::full(shape, 1.0)
	}

	/// `0, 1, .., n - 1` reshaped to `shape`.
	pub fn arange(shape: &[usize]) -> Self {
		let layout = Layout::contiguous(shape);
		let data = (0..layout.numel()).map(|v| v as f32).collect();
		Self::from_parts(layout, Rc::new(RefCell::new(data)))
	}

	pub fn id(&self) -> ValueId {
		self.0.id
	}

	pub fn layout(&self) -> Ref<'_, Layout> {
		self.0.layout.borrow()
	}

	pub fn shape(&self) -> Vec<usize> {
		self.layout().shape.to_vec()
	}

	pub fn strides(&self) -> Vec<usize> {
		self.layout().strides.to_vec()
	}

	pub fn ndim(&self) -> usize {
		self.layout().ndim()
	}

	pub fn numel(&self) -> usize {
		self.layout().numel()
	}

	pub fn is_contiguous(&self) -> bool {
		self.layout().is_contiguous()
	}

	/// Elements in row-major logical order.
	pub fn to_vec(&self) -> Vec<f32> {
		let storage = self.0.storage.borrow();
		self.layout()
			.offsets()
			.into_iter()
			.map(|offset| storage[offset])
			.collect()
	}

	/// True when both objects are windows over the same buffer.
	pub fn shares_storage(&self, other: &Tensor) -> bool {
		Rc::ptr_eq(&self.0.storage, &other.0.storage)
	}

	/// True when both are handles to the same object.
	pub fn same_object(&self, other: &Tensor) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Same shape and bit-identical elements.
	pub fn same_values(&self, other: &Tensor) -> bool {
		self.shape() == other.shape()
			&& self
				.to_vec()
				.iter()
				.zip(other.to_vec())
				.all(|(a, b)| a.to_bits() == b.to_bits())
	}

	/// New object over this object's storage.
	pub fn with_layout(&self, layout: Layout) -> Tensor {
		Self::from_parts(layout, Rc::clone(&self.0.storage))
	}

	/// Replaces this object's layout in place.
	pub fn set_layout(&self, layout: Layout) {
		*self.0.layout.borrow_mut() = layout;
	}

	/// Fresh contiguous tensor with the same values.
	pub fn contiguous_copy(&self) -> Tensor {
		let shape = self.shape();
		Self::from_parts(Layout::contiguous(&shape), Rc::new(RefCell::new(self.to_vec())))
	}

	/// Fresh contiguous tensor of `shape` holding `data`; lengths must agree.
	pub(crate) fn fresh(shape: &[usize], data: Vec<f32>) -> Tensor {
		debug_assert_eq!(shape.iter().product::<usize>(), data.len());
		Self::from_parts(Layout::contiguous(shape), Rc::new(RefCell::new(data)))
	}

	/// Overwrites this window's elements, row-major.
	pub(crate) fn write(&self, values: &[f32]) {
		let offsets = self.layout().offsets();
		debug_assert_eq!(offsets.len(), values.len());
		let mut storage = self.0.storage.borrow_mut();
		for (offset, value) in offsets.into_iter().zip(values) {
			storage[offset] = *value;
		}
	}
}

impl RawValue for Tensor {
	fn id(&self) -> ValueId {
		self.0.id
	}

	fn shape(&self) -> Vec<usize> {
		Tensor::shape(self)
	}
}

/// Compares values, not identity.
impl PartialEq for Tensor {
	fn eq(&self, other: &Self) -> bool {
		self.same_values(other)
	}
}

impl fmt::Debug for Tensor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tensor")
			.field("id", &self.0.id.get())
			.field("shape", &self.shape())
			.field("values", &self.to_vec())
			.finish()
	}
}

/// Renders like `tensor([[1., 1.], [1., 1.]])`.
impl fmt::Display for Tensor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let shape = self.shape();
		let values = self.to_vec();
		f.write_str("tensor(")?;
		write_nested(f, &shape, &values)?;
		f.write_str(")")
	}
}

fn write_nested(f: &mut fmt::Formatter<'_>, shape: &[usize], values: &[f32]) -> fmt::Result {
	let Some((&outer, inner)) = shape.split_first() else {
		return write_element(f, values.first().copied().unwrap_or_default());
	};
	let chunk = inner.iter().product::<usize>();
	f.write_str("[")?;
	for i in 0..outer {
		if i > 0 {
			f.write_str(", ")?;
		}
		write_nested(f, inner, &values[i * chunk..(i + 1) * chunk])?;
	}
	f.write_str("]")
}

fn write_element(f: &mut fmt::Formatter<'_>, value: f32) -> fmt::Result {
	if value.fract() == 0.0 && value.is_finite() {
		write!(f, "{value}.")
	} else {
		write!(f, "{value}")
	}
}
