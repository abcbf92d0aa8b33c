use crate::obis_code::ObisCode;
use thiserror::Error;

/// Main error type for DLMS operations
#[derive(Error, Debug)]
pub enum DlmsError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A capture of a profile could not be completed
    #[error("Capture failed for {obis}: {reason}")]
    Capture { obis: ObisCode, reason: String },

    /// A scheduler is already running against the given object
    #[error("Capture scheduler already active for {0}")]
    SchedulerActive(ObisCode),

    /// The background capture task terminated abnormally
    #[error("Capture task for {0} aborted")]
    TaskAborted(ObisCode),
}

/// Result type alias for DLMS operations
pub type DlmsResult<T> = Result<T, DlmsError>;
