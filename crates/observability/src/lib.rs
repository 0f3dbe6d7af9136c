//! Process-wide tracing setup shared by binaries and tests.

pub mod tracing;

pub use tracing::LogFormat;

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
