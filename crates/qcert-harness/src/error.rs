use qcert_core::QcertError;
use thiserror::Error;

/// Result of a single check procedure: `Ok` carries an optional detail
/// message for the pass notification.
pub type CheckResult = Result<Option<String>, CheckError>;

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Why a check did not pass
#[derive(Debug, Error)]
pub enum CheckError {
    /// An expectation did not hold; the check failed
    #[error("{0}")]
    Assertion(String),

    /// The adapter returned an error; the check errored
    #[error("adapter error: {0}")]
    Adapter(#[from] QcertError),

    /// Anything else that went wrong inside the check, including panics
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl CheckError {
    pub fn assertion(message: impl Into<String>) -> Self {
        CheckError::Assertion(message.into())
    }

    /// True when this error marks a failed (rather than errored) check
    pub fn is_assertion(&self) -> bool {
        matches!(self, CheckError::Assertion(_))
    }
}

/// Errors surfaced by the certification entry point
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("destructive operations were not acknowledged: {}", operations.join("; "))]
    RisksNotAcknowledged { operations: Vec<String> },

    #[error("provisioning failed during {stage}: {source}")]
    Provisioning {
        stage: String,
        #[source]
        source: QcertError,
    },

    #[error("check {sequence} ({category}) failed: {message}")]
    CheckFailed {
        sequence: u32,
        category: String,
        message: String,
    },

    #[error("check {sequence} ({category}) errored: {message}")]
    CheckErrored {
        sequence: u32,
        category: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    pub fn provisioning(stage: impl Into<String>, source: QcertError) -> Self {
        HarnessError::Provisioning {
            stage: stage.into(),
            source,
        }
    }
}

/// Return a [`CheckError::Assertion`] from the enclosing check unless
/// `cond` holds.
///
/// ```ignore
/// ensure_check!(rows.len() == 2, "expected 2 rows, got {}", rows.len());
/// ```
#[macro_export]
macro_rules! ensure_check {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::CheckError::Assertion(format!($($arg)+)));
        }
    };
}
