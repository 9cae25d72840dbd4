//! Audit record, entry, and filter types.
//!
//! `DecisionRecord` is what the guard hands to the audit log, one per
//! `authorize()` call. The log wraps it in an `AuditEntry`, assigning the
//! sequence number and the hash-chain links. Entries are never modified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    confirm::TokenId,
    principal::{PrincipalId, Route},
    tool::RouteCheck,
    verdict::{Outcome, Verdict},
};

/// The full decision trail for one authorize call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub principal: PrincipalId,
    pub route: Route,
    pub tool_name: String,
    /// Call arguments after masking.
    pub arguments: serde_json::Value,
    pub verdict: Verdict,
    /// How the route check resolved, when the pipeline got that far.
    pub route_check: Option<RouteCheck>,
    /// The token presented with the call, whether or not it was accepted.
    pub confirmation_token: Option<TokenId>,
    /// Wall-clock time the decision was made (UTC).
    pub timestamp: DateTime<Utc>,
}

/// One immutable entry in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Gap-free, strictly increasing position in the log, starting at 0.
    pub sequence: u64,
    pub record: DecisionRecord,
    /// SHA-256 hash (hex) of the previous entry, or the genesis hash.
    pub prev_hash: String,
    /// SHA-256 hash (hex) of this entry's canonical content.
    pub this_hash: String,
}

impl AuditEntry {
    /// The sentinel `prev_hash` of the first entry in every log.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Selects audit entries. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub tool_name: Option<String>,
    pub principal: Option<PrincipalId>,
    pub route: Option<Route>,
    pub outcome: Option<Outcome>,
    /// Inclusive lower bound on the decision timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the decision timestamp.
    pub until: Option<DateTime<Utc>>,
    /// Only entries with a sequence number strictly greater than this.
    pub after_sequence: Option<u64>,
}

impl AuditFilter {
    pub fn tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn principal(mut self, principal: PrincipalId) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    /// Restrict to decisions made in `[since, until)`.
    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn after(mut self, sequence: u64) -> Self {
        self.after_sequence = Some(sequence);
        self
    }

    /// Return true if `entry` satisfies every populated field.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        let record = &entry.record;
        self.tool_name.as_ref().map_or(true, |t| *t == record.tool_name)
            && self.principal.as_ref().map_or(true, |p| *p == record.principal)
            && self.route.as_ref().map_or(true, |r| *r == record.route)
            && self.outcome.map_or(true, |o| o == record.verdict.outcome())
            && self.since.map_or(true, |s| record.timestamp >= s)
            && self.until.map_or(true, |u| record.timestamp < u)
            && self.after_sequence.map_or(true, |a| entry.sequence > a)
    }
}
