//! Error types for the toolgate authorization pipeline.
//!
//! Every pipeline failure is a `GateError`. The guard converts errors into
//! verdicts through `GateError::deny_kind`, so no failure is ever silent and
//! no new variant can be added without deciding how it surfaces to callers.

use thiserror::Error;

use crate::verdict::DenyKind;

/// The unified error type for toolgate.
#[derive(Debug, Error)]
pub enum GateError {
    /// No declaration is registered under this tool name.
    #[error("tool '{tool}' is not registered")]
    UnknownTool { tool: String },

    /// A second declaration was registered under an existing tool name.
    #[error("tool '{tool}' is already declared")]
    DuplicateDeclaration { tool: String },

    /// The call arguments do not satisfy the tool's declared schema.
    #[error("arguments for '{tool}' violate schema: {reason}")]
    SchemaViolation { tool: String, reason: String },

    /// An explicit deny-list entry matched the tool.
    #[error("tool '{tool}' is deny-listed: {reason}")]
    DenylistMatch { tool: String, reason: String },

    /// The tool may not be called from the current route.
    #[error("tool '{tool}' is not reachable from route '{route}'")]
    RouteMismatch { tool: String, route: String },

    /// The principal's active grants do not cover the tool's capabilities.
    #[error("principal '{principal}' lacks capabilities {missing} required by '{tool}'")]
    InsufficientCapability {
        principal: String,
        tool: String,
        missing: String,
    },

    /// The tool is irreversible and no usable token accompanied the call.
    #[error("tool '{tool}' is irreversible and requires confirmation: {reason}")]
    ConfirmationRequired { tool: String, reason: String },

    /// The supplied token is unknown, already consumed, or bound to a
    /// different call.
    #[error("confirmation token rejected: {reason}")]
    ConfirmationInvalid { reason: String },

    /// The decision could not be durably recorded.
    ///
    /// Fatal to the calling authorize: an unaudited allow never surfaces.
    #[error("audit log unavailable: {reason}")]
    AuditUnavailable { reason: String },

    /// Grant or audit storage failed below the pipeline.
    #[error("storage error: {reason}")]
    StorageError { reason: String },

    /// A policy document or runtime setting is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl GateError {
    /// The verdict kind this error surfaces as.
    ///
    /// Registration and configuration errors never reach a verdict and
    /// return `None`. Storage errors inside the pipeline fail closed; the
    /// guard attributes them to the stage that raised them.
    pub fn deny_kind(&self) -> Option<DenyKind> {
        match self {
            GateError::UnknownTool { .. } => Some(DenyKind::UnknownTool),
            GateError::SchemaViolation { .. } => Some(DenyKind::SchemaViolation),
            GateError::DenylistMatch { .. } => Some(DenyKind::DenylistMatch),
            GateError::RouteMismatch { .. } => Some(DenyKind::RouteMismatch),
            GateError::InsufficientCapability { .. } => Some(DenyKind::InsufficientCapability),
            GateError::ConfirmationRequired { .. } => Some(DenyKind::ConfirmationRequired),
            GateError::ConfirmationInvalid { .. } => Some(DenyKind::ConfirmationInvalid),
            GateError::AuditUnavailable { .. } => Some(DenyKind::AuditUnavailable),
            GateError::DuplicateDeclaration { .. }
            | GateError::StorageError { .. }
            | GateError::ConfigError { .. } => None,
        }
    }
}

/// Convenience alias used throughout the toolgate crates.
pub type GateResult<T> = Result<T, GateError>;
