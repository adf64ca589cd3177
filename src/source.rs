//! Reading and writing the config file on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::lexer::tokenize_with;
use crate::parser::{ParseOptions, ParseReport, parse_report};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file does not exist. Callers may offer to create it.
    #[error("{}: no such config file", path.display())]
    NotFound { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read the config file as UTF-8 text.
pub fn read_config(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|e| SourceError::from_io(path, e))
}

/// Replace the config file atomically: the text goes to a temporary file
/// in the same directory which is then renamed over `path`.
pub fn write_config(path: &Path, text: &str) -> Result<(), SourceError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let io_err = |source: io::Error| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(text.as_bytes()).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = text.len(), "config written");
    Ok(())
}

/// Read and parse the config file.
pub fn load_document(path: &Path, options: &ParseOptions) -> Result<ParseReport, SourceError> {
    let text = read_config(path)?;
    let tokens = tokenize_with(&text, options.lex_options());
    Ok(parse_report(&tokens, options))
}
