use anyhow::Error;
use tracing::span::Span;

/// Records an error inside a span that has already been exited, so the error
/// line carries the span's fields.
pub trait LogError {
    fn log_error(&self, error: Error);
}

impl LogError for Span {
    fn log_error(&self, error: Error) {
        self.in_scope(|| {
            tracing::error!("Error: {error:?}");
        });
    }
}
