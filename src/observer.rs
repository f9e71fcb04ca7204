// src/observer.rs

use crate::error::DropError;

/// Gets told about backend failures so they can be reported somewhere.
///
/// The front end notifies the observer after an operation has failed; the store and the
/// splitter never call it themselves.
pub trait ErrorObserver {
    fn backend_error(&self, operation: &str, err: &DropError);
}

/// Reports backend failures as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ErrorObserver for TracingObserver {
    fn backend_error(&self, operation: &str, err: &DropError) {
        tracing::error!(operation, error = %err, "backend failure");
    }
}

/// Calls `observer` if `result` failed on the backend side, then hands the result back.
pub fn observe<T>(
    observer: &dyn ErrorObserver,
    operation: &str,
    result: Result<T, DropError>,
) -> Result<T, DropError> {
    if let Err(err) = &result {
        if err.is_backend_error() {
            observer.backend_error(operation, err);
        }
    }
    result
}
