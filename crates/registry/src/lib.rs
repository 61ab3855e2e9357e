//! Operation registry interface for the functionalization engine.
//!
//! The engine never looks inside array values. Everything it needs to know
//! about an operation lives here:
//!
//! - [`OpDef`] - direct kernel, arity and [`OpKind`] classification
//! - [`ScatterPlan`] - how a view op writes an updated view back into its base
//! - [`OpRegistry`] / [`RegistryBuilder`] - symbol table of definitions
//! - [`Dispatch`] - capability user programs route every operation through
//! - [`Eager`] - direct, non-functionalized execution

/// Operation definitions, kinds and scatter plans.
pub mod def;
/// Dispatch capability and the direct dispatcher.
pub mod dispatch;
/// Kernel and registry errors.
pub mod error;
/// Registry builder and immutable index.
pub mod index;
/// Value identity, scalars and multi-output results.
pub mod value;

pub use def::{Kernel, OpDef, OpKind, ScatterFn, ScatterOperand, ScatterPlan, ScatterStep};
pub use dispatch::{Dispatch, Eager};
pub use error::{KernelError, KernelResult, RegistryError};
pub use index::{Dangling, DanglingKind, OpRegistry, RegistryBuilder, invoke};
pub use value::{Arity, Outputs, RawValue, Scalar, ValueId};
