//! Reference raw value for the functionalization engine.
//!
//! [`Tensor`] is a strided `f32` array with real aliasing: views share storage
//! and in-place kernels really write through them. That makes it the reference
//! side of every equivalence check the engine is tested against.
//!
//! - [`builtin_registry`] - the builtin op table, scatter forms included
//! - [`TensorOps`] - method-style program surface over any [`purify_registry::Dispatch`]

/// Builtin op table and scatter forms.
pub mod builtins;
pub(crate) mod kernels;
/// Strided layouts.
pub mod layout;
mod ops;
mod tensor;

// Dev dependency used only by integration tests.
#[cfg(test)]
use proptest as _;

pub use builtins::{REGISTRY_LABEL, builtin_defs, builtin_registry};
pub use layout::Layout;
pub use ops::TensorOps;
pub use tensor::Tensor;
