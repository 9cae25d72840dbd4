//! Verdicts returned by the safety guard.
//!
//! Every outcome is a variant of a closed enum, so adding a new denial
//! reason forces every match over `DenyKind` to be revisited. Callers must
//! treat anything other than `Verdict::Allow` as "do not execute".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::confirm::PendingConfirmation;

/// Machine-readable reason a call was not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyKind {
    UnknownTool,
    SchemaViolation,
    DenylistMatch,
    RouteMismatch,
    InsufficientCapability,
    /// Retry with a confirmation token. Not a hard failure.
    ConfirmationRequired,
    ConfirmationInvalid,
    AuditUnavailable,
}

impl DenyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyKind::UnknownTool => "unknown_tool",
            DenyKind::SchemaViolation => "schema_violation",
            DenyKind::DenylistMatch => "denylist_match",
            DenyKind::RouteMismatch => "route_mismatch",
            DenyKind::InsufficientCapability => "insufficient_capability",
            DenyKind::ConfirmationRequired => "confirmation_required",
            DenyKind::ConfirmationInvalid => "confirmation_invalid",
            DenyKind::AuditUnavailable => "audit_unavailable",
        }
    }

    /// Everything except `ConfirmationRequired` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DenyKind::ConfirmationRequired)
    }
}

impl fmt::Display for DenyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The guard's final decision for one `authorize()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    /// The tool body may run.
    Allow,

    /// The call must not run.
    Deny {
        kind: DenyKind,
        /// Human-readable explanation, written to the audit log.
        reason: String,
    },

    /// The call is otherwise permitted but irreversible: obtain a token for
    /// `pending` and call again.
    NeedsConfirmation {
        pending: PendingConfirmation,
        reason: String,
    },
}

impl Verdict {
    pub fn deny(kind: DenyKind, reason: impl Into<String>) -> Self {
        Verdict::Deny {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// The deny kind carried by this verdict. `NeedsConfirmation` reports
    /// `ConfirmationRequired`; `Allow` reports nothing.
    pub fn kind(&self) -> Option<DenyKind> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny { kind, .. } => Some(*kind),
            Verdict::NeedsConfirmation { .. } => Some(DenyKind::ConfirmationRequired),
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Verdict::Allow => Outcome::Allow,
            Verdict::Deny { .. } => Outcome::Deny,
            Verdict::NeedsConfirmation { .. } => Outcome::NeedsConfirmation,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Verdict::Allow => "allowed",
            Verdict::Deny { reason, .. } | Verdict::NeedsConfirmation { reason, .. } => reason,
        }
    }
}

/// The verdict discriminant, used for audit filtering and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Deny,
    NeedsConfirmation,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::Deny => "deny",
            Outcome::NeedsConfirmation => "needs_confirmation",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the capability gate alone, before confirmation resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    NeedsConfirmation,
}
