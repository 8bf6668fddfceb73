use failure::Fail;
use slog::Record;
use slog::Result as SlogResult;
use slog::Serializer;
use slog::KV;

/// Render a failure chain as structured log fields.
///
/// Returns a value that can be passed directly as a key-value argument to the
/// `slog` logging macros, emitting the error display plus its `cause()` chain
/// under `error` and `error.cause.N` fields.
pub fn failure_info<E: Fail>(error: &E) -> FailureInfo {
    FailureInfo {
        display: error.to_string(),
        causes: {
            let mut causes = Vec::new();
            let mut cause = error.cause();
            while let Some(current) = cause {
                causes.push(current.to_string());
                cause = current.cause();
            }
            causes
        },
    }
}

pub struct FailureInfo {
    display: String,
    causes: Vec<String>,
}

impl KV for FailureInfo {
    fn serialize(&self, _record: &Record, serializer: &mut dyn Serializer) -> SlogResult {
        serializer.emit_str("error", &self.display)?;
        if !self.causes.is_empty() {
            serializer.emit_str("error.causes", &self.causes.join(" <- "))?;
        }
        Ok(())
    }
}
