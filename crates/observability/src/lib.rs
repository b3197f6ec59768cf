//! Tracing and logging setup shared by binaries.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Human-readable variant of [`init`] for command-line tools.
pub fn init_pretty() {
    tracing::init_pretty();
}

/// Initialize logging in the format named by `ROYALTYHUB_LOG_FORMAT`.
pub fn init_from_env() {
    match tracing::LogFormat::from_env() {
        tracing::LogFormat::Json => init(),
        tracing::LogFormat::Pretty => init_pretty(),
    }
}

/// Tracing configuration (filters, layers).
pub mod tracing;
