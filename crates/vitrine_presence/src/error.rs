// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for presence operations.

use std::fmt;

use recoverable::{Recovery, RecoveryInfo};

/// Classifies an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A setting is missing or invalid. Fatal for the calling request.
    Configuration,
    /// The stream or session does not exist.
    NotFound,
    /// The store could not be reached. The operation may succeed later.
    Unavailable,
    /// The store rejected or failed the operation for another reason.
    Store,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::NotFound => "not found",
            Self::Unavailable => "unavailable",
            Self::Store => "store",
        })
    }
}

/// An error from a presence operation.
///
/// Only [`ErrorKind::Unavailable`] is transient; the tracker logs and swallows those on the
/// best-effort paths (counter updates, bonus claims) and propagates everything else.
///
/// # Examples
///
/// ```
/// use recoverable::{Recovery, RecoveryKind};
/// use vitrine_presence::{Error, ErrorKind};
///
/// let error = Error::unavailable("connection reset");
/// assert_eq!(error.kind(), ErrorKind::Unavailable);
/// assert_eq!(error.recovery().kind(), RecoveryKind::Retry);
/// ```
#[ohno::error]
#[display("presence operation failed ({kind})")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a [`ErrorKind::Configuration`] error.
    pub fn configuration(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Configuration, cause)
    }

    /// Creates a [`ErrorKind::NotFound`] error.
    pub fn not_found(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::NotFound, cause)
    }

    /// Creates a [`ErrorKind::Unavailable`] error.
    pub fn unavailable(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Unavailable, cause)
    }

    /// Creates a [`ErrorKind::Store`] error.
    pub fn store(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Store, cause)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if retrying the operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Unavailable
    }
}

impl Recovery for Error {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            ErrorKind::Unavailable => RecoveryInfo::retry(),
            ErrorKind::Configuration | ErrorKind::NotFound | ErrorKind::Store => RecoveryInfo::never(),
        }
    }
}

/// A specialized [`Result`] type for presence operations.
pub type Result<T> = std::result::Result<T, Error>;
