//! Common error infrastructure for status-core.
//!
//! Domain-specific errors (`FormulaError`, `CatalogError`) live next to the
//! code that raises them. This module only provides the shared severity
//! classification so callers can decide between recovering, skipping, and
//! aborting without matching on every variant.

/// Severity level of an error, used for recovery strategies.
///
/// - **Recoverable**: the operation continues without the failed piece
/// - **Content**: bad data in a definition; the entry is skipped
/// - **Internal**: unexpected inconsistency that should be investigated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// The surrounding operation completes without this result.
    ///
    /// Examples: a stage damage formula that cannot be evaluated.
    Recoverable,

    /// Content data is wrong; the offending entry is ignored.
    ///
    /// Examples: a stage references a condition slug nobody defined.
    Content,

    /// Unexpected state inconsistency.
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Content => "content",
            Self::Internal => "internal",
        }
    }

    /// Returns true if the caller may carry on after logging.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable | Self::Content)
    }
}

/// Common trait for all status-core errors.
///
/// - All error enums implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
pub trait StatusError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
