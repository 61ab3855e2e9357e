//! Common setup for functionalization integration tests.

// Library and dev dependencies each test target links without naming.
use pretty_assertions as _;
use proptest as _;
use rustc_hash as _;
use serde as _;
use slab as _;
use smallvec as _;
use tempfile as _;
use thiserror as _;
use toml as _;

/// Routes engine events to the test writer; later calls are no-ops.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::TRACE)
		.with_test_writer()
		.try_init();
}
