//! Error taxonomy shared by every operation in the scheduling core.
//!
//! Mirrors the shape used across the pipeline: a small closed set of
//! [`ErrorCode`]s plus a human-facing message, attachable to an `anyhow`
//! chain via `.context(e /* TurnaError */)`. Handlers map every exception
//! onto one of these before it crosses a service boundary; `Internal`
//! errors are sanitized here and the original detail is only ever logged.

use std::borrow::Cow;

use serde::Serialize;

/// The closed set of error kinds operations in this core may return.
///
/// `Infeasible` is deliberately absent: it is a solver-local diagnostic,
/// not a surfaced error (see `turna-solver`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    BadRequest,
    Conflict,
    ServiceUnavailable,
    Internal,
}

/// A classified, user-facing error.
///
/// `short_msg` is a stable, ScreamingCamelCase tag usable in tests and
/// metrics without being coupled to copy changes in `msg`.
#[derive(thiserror::Error, Clone, Debug)]
#[error("{msg}")]
pub struct TurnaError {
    pub code: ErrorCode,
    pub short_msg: Cow<'static, str>,
    pub msg: Cow<'static, str>,
}

pub type TurnaResult<T> = Result<T, TurnaError>;

impl TurnaError {
    pub fn not_found(short_msg: impl Into<Cow<'static, str>>, msg: impl Into<Cow<'static, str>>) -> Self {
        Self { code: ErrorCode::NotFound, short_msg: short_msg.into(), msg: msg.into() }
    }

    pub fn forbidden(short_msg: impl Into<Cow<'static, str>>, msg: impl Into<Cow<'static, str>>) -> Self {
        Self { code: ErrorCode::Forbidden, short_msg: short_msg.into(), msg: msg.into() }
    }

    pub fn bad_request(short_msg: impl Into<Cow<'static, str>>, msg: impl Into<Cow<'static, str>>) -> Self {
        Self { code: ErrorCode::BadRequest, short_msg: short_msg.into(), msg: msg.into() }
    }

    pub fn conflict(short_msg: impl Into<Cow<'static, str>>, msg: impl Into<Cow<'static, str>>) -> Self {
        Self { code: ErrorCode::Conflict, short_msg: short_msg.into(), msg: msg.into() }
    }

    pub fn service_unavailable(short_msg: impl Into<Cow<'static, str>>, msg: impl Into<Cow<'static, str>>) -> Self {
        Self { code: ErrorCode::ServiceUnavailable, short_msg: short_msg.into(), msg: msg.into() }
    }

    /// Wraps an unexpected failure. Logs the full detail (`source`) at the
    /// call site and returns a sanitized, generic message to the caller so
    /// internals (SQL fragments, stack traces) never leak across the
    /// service boundary.
    pub fn internal(source: impl std::fmt::Display) -> Self {
        tracing::error!(error = %source, "internal error");
        Self {
            code: ErrorCode::Internal,
            short_msg: Cow::Borrowed("InternalError"),
            msg: Cow::Borrowed("an internal error occurred"),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::ServiceUnavailable)
    }
}

impl From<anyhow::Error> for TurnaError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TurnaError>() {
            Ok(turna_err) => turna_err,
            Err(err) => TurnaError::internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_never_leaks_source_text() {
        let source = anyhow::anyhow!("SELECT * FROM demand WHERE leaked_secret = 'xyz'");
        let err: TurnaError = source.into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.msg.contains("leaked_secret"));
    }

    #[test]
    fn downcasts_preserve_original_code() {
        let original = TurnaError::conflict("LastFoothold", "cannot remove last active member");
        let wrapped: anyhow::Error = anyhow::Error::new(original.clone());
        let recovered: TurnaError = wrapped.into();
        assert_eq!(recovered.code, ErrorCode::Conflict);
        assert_eq!(recovered.short_msg, original.short_msg);
    }
}
