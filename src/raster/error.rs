use thiserror::Error;

/// Failure taxonomy shared by every pixel operation.
///
/// `UnsupportedFormat` is the only recoverable variant: callers escalate it
/// through an ordered fallback chain. Everything else is fatal for the
/// current image.
#[derive(Error, Debug)]
pub enum PixelError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("I/O failure while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl PixelError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_))
    }

    /// Adapter for `map_err` that attaches what was being attempted.
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }
}
