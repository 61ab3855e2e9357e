use smallvec::SmallVec;

pub type Dims = SmallVec<[usize; 4]>;

/// Shape, strides and storage offset of a strided array.
///
/// Strides are in elements. Layout operations never touch storage; they
/// describe a different window over the same elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
	pub shape: Dims,
	pub strides: Dims,
	pub offset: usize,
}

impl Layout {
	/// Row-major layout over a fresh buffer.
	pub fn contiguous(shape: &[usize]) -> Self {
		Self {
			shape: shape.into(),
			strides: contiguous_strides(shape),
			offset: 0,
		}
	}

	pub fn ndim(&self) -> usize {
		self.shape.len()
	}

	pub fn numel(&self) -> usize {
		self.shape.iter().product()
	}

	pub fn is_contiguous(&self) -> bool {
		let mut expected = 1;
		for (&size, &stride) in self.shape.iter().zip(&self.strides).rev() {
			if size != 1 && stride != expected {
				return false;
			}
			expected *= size;
		}
		true
	}

	/// Storage offsets of every element, in row-major logical order.
	pub fn offsets(&self) -> Vec<usize> {
		let numel = self.numel();
		let mut out = Vec::with_capacity(numel);
		if numel == 0 {
			return out;
		}
		let mut index: Dims = SmallVec::from_elem(0, self.ndim());
		let mut offset = self.offset;
		loop {
			out.push(offset);
			let mut dim = self.ndim();
			loop {
				if dim == 0 {
					return out;
				}
				dim -= 1;
				index[dim] += 1;
				offset += self.strides[dim];
				if index[dim] < self.shape[dim] {
					break;
				}
				offset -= self.strides[dim] * index[dim];
				index[dim] = 0;
			}
		}
	}

	/// Reinterprets the elements under a new shape without copying.
	///
	/// Returns `None` when the new shape cannot be expressed over the existing
	/// strides, or when the element counts differ.
	pub fn view(&self, shape: &[usize]) -> Option<Self> {
		if shape.iter().product::<usize>() != self.numel() {
			return None;
		}
		let strides = compute_view_strides(&self.shape, &self.strides, shape)?;
		Some(Self {
			shape: shape.into(),
			strides,
			offset: self.offset,
		})
	}

	pub fn transpose(&self, d0: usize, d1: usize) -> Self {
		let mut out = self.clone();
		out.shape.swap(d0, d1);
		out.strides.swap(d0, d1);
		out
	}

	/// Main diagonal of a 2-D layout.
	pub fn diagonal(&self) -> Self {
		let len = self.shape[0].min(self.shape[1]);
		Self {
			shape: SmallVec::from_slice(&[len]),
			strides: SmallVec::from_slice(&[self.strides[0] + self.strides[1]]),
			offset: self.offset,
		}
	}

	/// Drops `dim`, fixing it at `index`.
	pub fn select(&self, dim: usize, index: usize) -> Self {
		let mut out = self.clone();
		out.offset += index * self.strides[dim];
		out.shape.remove(dim);
		out.strides.remove(dim);
		out
	}

	/// Restricts `dim` to `start..start + len`.
	pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Self {
		let mut out = self.clone();
		if len > 0 {
			out.offset += start * self.strides[dim];
		}
		out.shape[dim] = len;
		out
	}

	pub fn unsqueeze(&self, dim: usize) -> Self {
		let stride = if dim < self.ndim() {
			self.strides[dim] * self.shape[dim]
		} else {
			1
		};
		let mut out = self.clone();
		out.shape.insert(dim, 1);
		out.strides.insert(dim, stride);
		out
	}

	/// Removes size-1 dims: `dim` only, or all of them.
	pub fn squeeze(&self, dim: Option<usize>) -> Self {
		let mut out = self.clone();
		match dim {
			Some(d) if self.shape[d] == 1 => {
				out.shape.remove(d);
				out.strides.remove(d);
			}
			Some(_) => {}
			None => {
				let (shape, strides) = self
					.shape
					.iter()
					.zip(&self.strides)
					.filter(|(size, _)| **size != 1)
					.map(|(&size, &stride)| (size, stride))
					.unzip();
				out.shape = shape;
				out.strides = strides;
			}
		}
		out
	}

	/// Broadcasts to `shape`, using stride 0 for repeated dims.
	pub fn expand(&self, shape: &[usize]) -> Option<Self> {
		if shape.len() < self.ndim() {
			return None;
		}
		let lead = shape.len() - self.ndim();
		let mut strides: Dims = SmallVec::from_elem(0, shape.len());
		for (i, &target) in shape.iter().enumerate().skip(lead) {
			let size = self.shape[i - lead];
			strides[i] = if size == target {
				self.strides[i - lead]
			} else if size == 1 {
				0
			} else {
				return None;
			};
		}
		Some(Self {
			shape: shape.into(),
			strides,
			offset: self.offset,
		})
	}
}

pub fn contiguous_strides(shape: &[usize]) -> Dims {
	let mut strides: Dims = SmallVec::from_elem(1, shape.len());
	for i in (0..shape.len().saturating_sub(1)).rev() {
		strides[i] = strides[i + 1] * shape[i + 1].max(1);
	}
	strides
}

/// Common shape two operands broadcast to, numpy rules.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Dims> {
	let ndim = a.len().max(b.len());
	let mut out: Dims = SmallVec::from_elem(1, ndim);
	for i in 0..ndim {
		let x = if i + a.len() >= ndim { a[i + a.len() - ndim] } else { 1 };
		let y = if i + b.len() >= ndim { b[i + b.len() - ndim] } else { 1 };
		out[i] = match (x, y) {
			(x, y) if x == y => x,
			(1, y) => y,
			(x, 1) => x,
			_ => return None,
		};
	}
	Some(out)
}

/// Strides for viewing `old_shape`/`old_strides` as `new_shape`, if possible.
///
/// Dims are grouped into chunks that are contiguous with each other; a view is
/// legal iff every chunk of the old shape maps onto whole dims of the new one.
fn compute_view_strides(old_shape: &[usize], old_strides: &[usize], new_shape: &[usize]) -> Option<Dims> {
	if old_shape.is_empty() {
		return Some(SmallVec::from_elem(1, new_shape.len()));
	}
	if old_shape.iter().product::<usize>() == 0 {
		return Some(contiguous_strides(new_shape));
	}

	let mut new_strides: Dims = SmallVec::from_elem(0, new_shape.len());
	let mut view_d = new_shape.len();
	let mut chunk_base_stride = old_strides[old_strides.len() - 1];
	let mut tensor_numel = 1;
	let mut view_numel = 1;
	for tensor_d in (0..old_shape.len()).rev() {
		tensor_numel *= old_shape[tensor_d];
		let chunk_ends = tensor_d == 0
			|| (old_shape[tensor_d - 1] != 1
				&& old_strides[tensor_d - 1] != tensor_numel * chunk_base_stride);
		if !chunk_ends {
			continue;
		}
		while view_d > 0 && (view_numel < tensor_numel || new_shape[view_d - 1] == 1) {
			new_strides[view_d - 1] = view_numel * chunk_base_stride;
			view_numel *= new_shape[view_d - 1];
			view_d -= 1;
		}
		if view_numel != tensor_numel {
			return None;
		}
		if tensor_d > 0 {
			chunk_base_stride = old_strides[tensor_d - 1];
			tensor_numel = 1;
			view_numel = 1;
		}
	}
	(view_d == 0).then_some(new_strides)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_offsets_row_major() {
		let layout = Layout::contiguous(&[2, 3]);
		assert_eq!(layout.offsets(), vec![0, 1, 2, 3, 4, 5]);
		assert_eq!(layout.transpose(0, 1).offsets(), vec![0, 3, 1, 4, 2, 5]);
	}

	#[test]
	fn test_diagonal_and_select() {
		let layout = Layout::contiguous(&[3, 3]);
		assert_eq!(layout.diagonal().offsets(), vec![0, 4, 8]);
		assert_eq!(layout.select(0, 1).offsets(), vec![3, 4, 5]);
		assert_eq!(layout.select(1, 2).offsets(), vec![2, 5, 8]);
	}

	#[test]
	fn test_view_of_transposed_requires_compatible_strides() {
		let t = Layout::contiguous(&[2, 4]).transpose(0, 1);
		assert!(t.view(&[8]).is_none());
		assert!(t.view(&[4, 1, 2]).is_some());
		assert_eq!(t.unsqueeze(0).squeeze(None), t);
	}

	#[test]
	fn test_view_flatten_and_split_dims() {
		let layout = Layout::contiguous(&[4, 2]);
		let flat = layout.view(&[8]).unwrap();
		assert_eq!(flat.strides.as_slice(), &[1]);
		let back = flat.view(&[2, 4]).unwrap();
		assert_eq!(back.strides.as_slice(), &[4, 1]);
		assert!(layout.view(&[3, 3]).is_none());
	}

	#[test]
	fn test_expand_and_broadcast() {
		let row = Layout::contiguous(&[2]);
		let wide = row.expand(&[3, 2]).unwrap();
		assert_eq!(wide.offsets(), vec![0, 1, 0, 1, 0, 1]);
		assert!(row.expand(&[3]).is_none());
		assert_eq!(
			broadcast_shapes(&[4, 1], &[2]).unwrap().as_slice(),
			&[4, 2]
		);
		assert!(broadcast_shapes(&[3], &[2]).is_none());
	}

	#[test]
	fn test_narrow_and_contiguity() {
		let layout = Layout::contiguous(&[4, 2]);
		let tail = layout.narrow(0, 2, 2);
		assert_eq!(tail.offsets(), vec![4, 5, 6, 7]);
		assert!(tail.is_contiguous());
		assert!(!layout.narrow(1, 0, 1).is_contiguous());
	}
}
