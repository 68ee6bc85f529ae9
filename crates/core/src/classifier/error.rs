//! Classifier invocation failures.

use mycoguard_shared::{AppError, Diagnostic};
use thiserror::Error;

/// Why a classification run produced no usable verdict.
#[derive(Debug, Error)]
pub enum InvocationFailure {
    /// The process could not be started.
    #[error("failed to spawn classifier '{program}': {source}")]
    Spawn {
        /// Program that was spawned.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("classifier exited with status {code:?}")]
    NonZeroExit {
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The process succeeded but printed no usable verdict.
    #[error("classifier output contained no verdict")]
    MalformedOutput {
        /// Captured standard output.
        raw_output: String,
    },

    /// The verdict named a class outside the label set.
    #[error("classifier returned unrecognized label '{label}'")]
    UnrecognizedLabel {
        /// Class name as reported.
        label: String,
        /// Captured standard output.
        raw_output: String,
    },

    /// The process ran past its deadline and was killed.
    #[error("classifier timed out after {after_secs}s")]
    TimedOut {
        /// Configured limit in seconds.
        after_secs: u64,
    },

    /// Reading the process pipes failed.
    #[error("classifier I/O error: {0}")]
    Io(String),
}

impl InvocationFailure {
    /// Returns the error code for logs and API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "CLASSIFIER_SPAWN_FAILED",
            Self::NonZeroExit { .. } => "CLASSIFIER_FAILED",
            Self::MalformedOutput { .. } => "CLASSIFIER_MALFORMED_OUTPUT",
            Self::UnrecognizedLabel { .. } => "CLASSIFIER_UNRECOGNIZED_LABEL",
            Self::TimedOut { .. } => "CLASSIFIER_TIMED_OUT",
            Self::Io(_) => "CLASSIFIER_IO_ERROR",
        }
    }
}

impl From<InvocationFailure> for AppError {
    fn from(failure: InvocationFailure) -> Self {
        match failure {
            InvocationFailure::Spawn { ref source, .. } => Self::upstream(
                "Classification process could not be started",
                Some(Diagnostic::Error(source.to_string())),
            ),
            InvocationFailure::NonZeroExit { stderr, .. } => Self::upstream(
                "Classification process failed",
                Some(Diagnostic::Error(stderr)),
            ),
            InvocationFailure::MalformedOutput { raw_output } => Self::upstream(
                "Failed to parse classification result",
                Some(Diagnostic::RawOutput(raw_output)),
            ),
            InvocationFailure::UnrecognizedLabel { raw_output, .. } => Self::upstream(
                "Classification returned an unrecognized label",
                Some(Diagnostic::RawOutput(raw_output)),
            ),
            InvocationFailure::TimedOut { after_secs } => Self::upstream(
                "Classification process timed out",
                Some(Diagnostic::Error(format!("timed out after {after_secs}s"))),
            ),
            InvocationFailure::Io(message) => Self::upstream(
                "Classification process failed",
                Some(Diagnostic::Error(message)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_reports_stderr() {
        let err: AppError = InvocationFailure::NonZeroExit {
            code: Some(1),
            stderr: "model load error".into(),
        }
        .into();

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Classification process failed");
        let AppError::Upstream {
            diagnostic: Some(Diagnostic::Error(text)),
            ..
        } = err
        else {
            panic!("expected stderr diagnostic");
        };
        assert!(text.contains("model load error"));
    }

    #[test]
    fn test_malformed_output_reports_raw_output() {
        let err: AppError = InvocationFailure::MalformedOutput {
            raw_output: "Loading model...".into(),
        }
        .into();

        assert_eq!(err.public_message(), "Failed to parse classification result");
        assert!(matches!(
            err,
            AppError::Upstream {
                diagnostic: Some(Diagnostic::RawOutput(_)),
                ..
            }
        ));
    }

    #[test]
    fn test_timeout_is_distinct() {
        let failure = InvocationFailure::TimedOut { after_secs: 120 };
        assert_eq!(failure.error_code(), "CLASSIFIER_TIMED_OUT");

        let err: AppError = failure.into();
        assert_eq!(err.public_message(), "Classification process timed out");
    }
}
