//! Encoding map files: JSON-serialized structural trees.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bem_core::{BemError, BinaryEncoding, ErrorClass, ObjectState};
use tracing::debug;

/// Failure while reading, decoding or writing an encoding map file.
#[derive(Debug)]
pub enum ToolError {
    /// The file could not be read or written.
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The file is not a JSON structural tree.
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// The tree does not describe a valid encoding map.
    Bem {
        /// File involved.
        path: PathBuf,
        /// Rejection raised by the model.
        source: BemError,
    },
}

impl ToolError {
    /// File the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } | Self::Bem { path, .. } => path,
        }
    }

    /// Process exit status for this error.
    ///
    /// I/O problems exit with 1, malformed files with 2 and design errors
    /// (naming, encoding, access) with 3.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. } => 1,
            Self::Json { .. } => 2,
            Self::Bem { source, .. } if source.class() == ErrorClass::Load => 2,
            Self::Bem { .. } => 3,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path().display();
        match self {
            Self::Io { source, .. } => write!(f, "{path}: error: {source}"),
            Self::Json { source, .. } => write!(f, "{path}: error: invalid JSON: {source}"),
            Self::Bem { source, .. } => write!(f, "{path}: error: {source}"),
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Bem { source, .. } => Some(source),
        }
    }
}

/// Decodes a structural tree from JSON text.
///
/// # Errors
///
/// Returns [`ToolError::Json`] if `text` is not a serialized tree.
pub fn parse_state(path: &Path, text: &str) -> Result<ObjectState, ToolError> {
    serde_json::from_str(text).map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes a map as pretty-printed JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`ToolError::Json`] if serialization fails.
pub fn render_state(path: &Path, bem: &BinaryEncoding) -> Result<String, ToolError> {
    let mut text = serde_json::to_string_pretty(&bem.save_state()).map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');
    Ok(text)
}

/// Reads and restores the encoding map stored at `path`.
///
/// # Errors
///
/// Returns a [`ToolError`] if the file cannot be read, is not JSON, or does
/// not describe a valid map.
pub fn load_map(path: &Path) -> Result<BinaryEncoding, ToolError> {
    let text = fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let state = parse_state(path, &text)?;
    let bem = BinaryEncoding::load_state(&state).map_err(|source| ToolError::Bem {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), width = bem.width(), "encoding map file read");
    Ok(bem)
}

/// Writes `bem` to `path` in canonical form.
///
/// # Errors
///
/// Returns a [`ToolError`] if serialization or the write fails.
pub fn save_map(path: &Path, bem: &BinaryEncoding) -> Result<(), ToolError> {
    let text = render_state(path, bem)?;
    fs::write(path, text).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "encoding map file written");
    Ok(())
}
