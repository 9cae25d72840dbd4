//! The tool-execution layer seen by the agent.
//!
//! `ToolRunner` asks the guard about every call and runs the tool body only
//! on `Verdict::Allow`. It never runs a body for any other verdict.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use toolgate_contracts::{
    confirm::PendingConfirmation,
    principal::AuthorizationRequest,
    verdict::{DenyKind, Verdict},
};
use toolgate_core::SafetyGuard;

/// A tool's side-effecting body.
pub type ToolBody = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// What happened to one call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The guard allowed the call and the body ran.
    Completed { output: Value, sequence: u64 },

    /// The call is irreversible: confirm with the user, obtain a token for
    /// `pending`, and call again.
    NeedsConfirmation {
        pending: PendingConfirmation,
        reason: String,
        sequence: u64,
    },

    /// The call was refused. `sequence` is `None` only when the decision
    /// could not be audited.
    Denied {
        kind: DenyKind,
        reason: String,
        sequence: Option<u64>,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    pub fn deny_kind(&self) -> Option<DenyKind> {
        match self {
            RunOutcome::Denied { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        match self {
            RunOutcome::Completed { sequence, .. }
            | RunOutcome::NeedsConfirmation { sequence, .. } => Some(*sequence),
            RunOutcome::Denied { sequence, .. } => *sequence,
        }
    }

    /// One-line description for demo output.
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::Completed { .. } => "ALLOW".to_string(),
            RunOutcome::NeedsConfirmation { .. } => "NEEDS_CONFIRMATION".to_string(),
            RunOutcome::Denied { kind, .. } => format!("DENY ({kind})"),
        }
    }
}

/// Guard plus tool bodies.
pub struct ToolRunner {
    guard: SafetyGuard,
    bodies: HashMap<String, ToolBody>,
}

impl ToolRunner {
    pub fn new(guard: SafetyGuard) -> Self {
        Self {
            guard,
            bodies: HashMap::new(),
        }
    }

    /// Register the body for `tool_name`, replacing any previous one.
    pub fn register<F>(&mut self, tool_name: impl Into<String>, body: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.bodies.insert(tool_name.into(), Box::new(body));
    }

    pub fn guard(&self) -> &SafetyGuard {
        &self.guard
    }

    pub fn call(&self, request: &AuthorizationRequest) -> RunOutcome {
        self.call_at(request, Utc::now())
    }

    /// `call` with an explicit clock.
    pub fn call_at(&self, request: &AuthorizationRequest, now: DateTime<Utc>) -> RunOutcome {
        let decision = self.guard.authorize_at(request, now);

        match (decision.verdict, decision.sequence) {
            (Verdict::Allow, Some(sequence)) => {
                let output = match self.bodies.get(&request.tool_name) {
                    Some(body) => body(&request.arguments),
                    None => {
                        warn!(tool = %request.tool_name, "allowed tool has no registered body");
                        Value::Null
                    }
                };
                RunOutcome::Completed { output, sequence }
            }
            (Verdict::NeedsConfirmation { pending, reason }, Some(sequence)) => {
                RunOutcome::NeedsConfirmation {
                    pending,
                    reason,
                    sequence,
                }
            }
            (Verdict::Deny { kind, reason }, sequence) => RunOutcome::Denied {
                kind,
                reason,
                sequence,
            },
            // The guard only omits a sequence on an audit failure, which it
            // always reports as a deny.
            (verdict, None) => RunOutcome::Denied {
                kind: DenyKind::AuditUnavailable,
                reason: format!("unaudited {} verdict discarded", verdict.outcome()),
                sequence: None,
            },
        }
    }
}
