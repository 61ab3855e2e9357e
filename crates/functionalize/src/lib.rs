//! Functionalization of mutating, aliasing array programs.
//!
//! A program written against [`purify_registry::Dispatch`] runs unchanged under a
//! [`Functionalizer`]. Every operation touching a wrapped value is rewritten into
//! pure registry calls: in-place ops become their functional counterparts, views
//! are recorded so they can be regenerated from their root, and writes through
//! views are scattered back into the root before anyone reads it. Aliasing
//! between user-visible values survives the rewrite.
//!
//! - [`Functionalizer`] - session: wrap, intercept, synchronize, unwrap
//! - [`AliasGraph`] - records of wrapped values and their view chains
//! - [`enable`] / [`disable`] / [`FunctionalizationGuard`] - per-thread toggle
//! - [`TraceSink`] / [`CaptureLog`] - observation of issued operations
//! - [`SessionConfig`] - collection, flush and tracing policy

/// Session policy loaded from TOML.
pub mod config;
mod error;
/// Alias graph arena.
pub mod graph;
mod handle;
mod mode;
mod session;
/// Operation trace sinks.
pub mod trace;

// Dev dependency used only by integration tests.
#[cfg(test)]
use proptest as _;

pub use config::{CollectPolicy, ConfigError, FlushPolicy, SessionConfig};
pub use error::{FunctionalizeError, InvalidState, Result, UnsupportedReason};
pub use graph::{AliasGraph, NodeId, ViewMeta};
pub use handle::{FunctionalTensor, Operand, SessionId};
pub use mode::{FunctionalizationGuard, disable, enable, is_enabled};
pub use session::Functionalizer;
pub use trace::{CaptureLog, LogSink, OpRecord, TraceSink};
