//! Common error types for the rotation pipeline

use thiserror::Error;

/// Common result type for rotation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every rotation stage
///
/// Geometry tolerance failures are not errors; see `GeometryWarning` in the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad argument shape (wrong channel count, cross-station pairing, conflicting
    /// location and azimuth). Raised before any work begins.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing waveform data, rotation template, station or event data.
    /// Fatal for the affected pair or signal detection only.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Reconciliation precondition violated. Aborts the whole transaction before
    /// the shared state is touched.
    #[error("Reconciliation invariant violated: {0}")]
    ReconciliationInvariant(String),

    /// Numeric rotation kernel failure
    #[error("Rotation kernel error: {0}")]
    Kernel(String),

    /// Filter design or application failure
    #[error("Filter error: {0}")]
    Filter(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for errors that only invalidate one unit of work (a pair or a detection)
    pub fn is_unit_scoped(&self) -> bool {
        matches!(
            self,
            Error::DataUnavailable(_) | Error::Kernel(_) | Error::Filter(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = Error::Validation("Must provide exactly two channels".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: Must provide exactly two channels"
        );
    }

    #[test]
    fn test_unit_scoped_errors() {
        assert!(Error::DataUnavailable("x".into()).is_unit_scoped());
        assert!(Error::Kernel("x".into()).is_unit_scoped());
        assert!(!Error::Validation("x".into()).is_unit_scoped());
        assert!(!Error::ReconciliationInvariant("x".into()).is_unit_scoped());
    }

    #[test]
    fn test_from_serde_json() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
