//! Error types for parsing, composition and the export pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, composing or writing a panel.
#[derive(Debug, Error)]
pub enum PanelError {
    /// A Gerber or Excellon statement could not be understood.
    #[error("{file}:{line}: cannot parse `{token}`: {message}")]
    Parse {
        /// Name of the file being parsed.
        file: String,
        /// One-based line number of the offending statement.
        line: usize,
        /// The offending token, verbatim.
        token: String,
        /// What went wrong.
        message: String,
    },

    /// A required layer (usually the board outline) is absent.
    #[error("missing layer: {0}")]
    MissingLayer(String),

    /// The file is neither RS-274X, Excellon, IPC-356 nor DXF.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Reading or writing a file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path that was being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Composition produced something that cannot be represented.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// An aperture macro expression is malformed.
    #[error("macro error: {0}")]
    Macro(String),

    /// A zip archive could not be unpacked.
    #[error("archive error: {0}")]
    Archive(String),

    /// A parameter file could not be loaded.
    #[error("configuration error in {}: {message}", path.display())]
    Config {
        /// The parameter file path, or the preset name.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Export was requested on a layout whose tabs do not all attach.
    #[error("layout invalid: {disconnected} tab(s) do not attach on both sides")]
    LayoutInvalid {
        /// Number of disconnected tabs.
        disconnected: usize,
    },

    /// The progress callback asked the pipeline to stop.
    #[error("export cancelled")]
    Cancelled,
}

impl PanelError {
    /// Builds a [`PanelError::Parse`] for `token` at `line` of `file`.
    pub fn parse(file: &str, line: usize, token: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.to_string(),
            line,
            token: token.to_string(),
            message: message.into(),
        }
    }

    /// Builds a [`PanelError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
