//! Binary encoding map viewer and checker library.

use tracing_subscriber as _;

/// Encoding map file I/O and CLI error type.
pub mod file;
/// Human-readable encoding map report.
pub mod view;

#[cfg(test)]
use tempfile as _;
