//! Apply workflow: write, validate, persist, reload.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::admin::{AdminClient, AdminError};
use crate::ast::{Document, DocumentError};
use crate::diagnostics::Diagnostic;
use crate::source::{SourceError, write_config};
use crate::validate::{BridgeError, Validator, Verdict};
use crate::writer::write_document;

/// Each stage of [`apply`] fails with its own variant.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("configuration invalid ({} diagnostic(s))", .0.len())]
    Invalid(Vec<Diagnostic>),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Validation passed but the live server refused the text.
    #[error("reload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error(transparent)]
    Admin(AdminError),
}

impl From<AdminError> for ApplyError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Rejected { status, message } => Self::Rejected { status, message },
            other => Self::Admin(other),
        }
    }
}

/// Write `document`, validate the text, save it to `path`, and load it
/// into the running server. Returns the applied text.
///
/// Nothing is written to disk unless the validator accepts the text. A
/// reload rejection leaves the new file in place.
pub async fn apply(
    document: &Document,
    validator: &dyn Validator,
    admin: &AdminClient,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<String, ApplyError> {
    document.check_unique()?;
    let text = write_document(document);

    match validator.validate(&text, cancel).await? {
        Verdict::Valid(warnings) => {
            for w in &warnings {
                warn!(line = w.line, message = %w.message, "validation warning");
            }
        }
        Verdict::Invalid(diagnostics) => return Err(ApplyError::Invalid(diagnostics)),
    }

    write_config(path, &text)?;
    admin.load(&text, cancel).await?;

    info!(path = %path.display(), sites = document.sites.len(), "configuration applied");
    Ok(text)
}
