//! Tool declaration and security policy types.
//!
//! A `ToolDeclaration` is produced once, at registration time, by whatever
//! owns the tool registry. The guard only ever reads it.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;

/// Whether a tool's side effects can be undone by the system itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reversibility {
    Reversible,
    Irreversible,
}

impl Reversibility {
    pub fn from_flag(reversible: bool) -> Self {
        if reversible {
            Self::Reversible
        } else {
            Self::Irreversible
        }
    }

    pub fn is_irreversible(&self) -> bool {
        matches!(self, Self::Irreversible)
    }
}

/// Everything the guard knows about one registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Registry key, e.g. `"email.send"`.
    pub name: String,
    pub description: String,
    /// JSON Schema the call arguments must satisfy. `Null` means no constraint.
    pub schema: serde_json::Value,
    /// Capabilities a principal must hold to invoke the tool.
    pub capabilities: CapabilitySet,
    pub reversibility: Reversibility,
    /// Routes the tool may be called from. `"*"` matches any route.
    pub expected_routes: Vec<String>,
    /// Dotted path into the arguments naming the call's target, checked
    /// against grant scopes (e.g. `"calendar_id"`).
    pub target_field: Option<String>,
}

impl ToolDeclaration {
    /// Return true if `route` is one of the tool's expected routes.
    pub fn expects_route(&self, route: &str) -> bool {
        self.expected_routes.iter().any(|r| r == "*" || r == route)
    }

    /// Resolve the call's target from its arguments, if the tool declares one.
    ///
    /// String targets are returned as-is; numbers and booleans are rendered.
    pub fn target<'a>(&self, arguments: &'a serde_json::Value) -> Option<Cow<'a, str>> {
        let path = self.target_field.as_deref()?;
        let mut current = arguments;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        match current {
            serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            serde_json::Value::Number(n) => Some(Cow::Owned(n.to_string())),
            serde_json::Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }
}

/// Explicit allow/deny classification for a tool.
///
/// Deny always wins. Allow bypasses route matching. Unspecified falls
/// through to route matching.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListEntry {
    Allow,
    Deny {
        /// Human-readable explanation, written to the audit log.
        reason: String,
    },
    #[default]
    Unspecified,
}

/// How a route check resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteCheck {
    /// The route is one of the tool's expected routes.
    Matched,
    /// The tool is in the route-independent safe set.
    RouteIndependent,
    /// The tool is explicitly allow-listed, so routing was not consulted.
    AllowListed,
    Mismatch,
}
