//! Principal, route, and request types.
//!
//! These describe one requested tool call as it arrives from the
//! tool-execution layer. The core never decides which tool a request names;
//! it receives an already-resolved name plus the route the router assigned.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::confirm::TokenId;

/// Opaque identifier of the agent session a call is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The classified conversational intent active for one request.
///
/// Routes are opaque to the core. `Route::unknown()` is what the router
/// hands over when classification failed or was ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(pub String);

impl Route {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(route: impl Into<String>) -> Self {
        Self(route.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tool call awaiting a verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub principal: PrincipalId,
    pub route: Route,
    pub tool_name: String,
    /// Raw call arguments. Redacted before they reach the audit log.
    pub arguments: serde_json::Value,
    /// Token from a previous `NeedsConfirmation` round trip, if any.
    pub confirmation_token: Option<TokenId>,
}

impl AuthorizationRequest {
    pub fn new(
        principal: PrincipalId,
        route: Route,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            principal,
            route,
            tool_name: tool_name.into(),
            arguments,
            confirmation_token: None,
        }
    }

    /// Attach a confirmation token to this request.
    pub fn with_token(mut self, token: TokenId) -> Self {
        self.confirmation_token = Some(token);
        self
    }
}
