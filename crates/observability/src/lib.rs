//! Tracing and logging setup shared by the storefront binaries.

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging with the format chosen by
/// `STOREFRONT_LOG_FORMAT` (JSON unless set to `text`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(LogFormat::from_env());
}
