//! Capability taxonomy and grant types.
//!
//! The taxonomy is closed: every side effect a tool can have maps to one of
//! the `Capability` variants below, and no capability can be defined at
//! runtime. Grants bind a set of capabilities to a principal, optionally
//! restricted by scope and bounded by an expiry.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::PrincipalId;

/// One class of side effect a tool may perform.
///
/// Serialized in kebab-case (`"send-communication"`) so policy files and
/// audit records read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ReadLocalData,
    WriteLocalData,
    NetworkEgress,
    SendCommunication,
    ModifyCalendar,
    ExecuteCode,
    FinancialTransaction,
}

impl Capability {
    /// Every member of the taxonomy, in declaration order.
    pub const ALL: [Capability; 7] = [
        Capability::ReadLocalData,
        Capability::WriteLocalData,
        Capability::NetworkEgress,
        Capability::SendCommunication,
        Capability::ModifyCalendar,
        Capability::ExecuteCode,
        Capability::FinancialTransaction,
    ];

    /// The stable kebab-case name used in configuration and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadLocalData => "read-local-data",
            Capability::WriteLocalData => "write-local-data",
            Capability::NetworkEgress => "network-egress",
            Capability::SendCommunication => "send-communication",
            Capability::ModifyCalendar => "modify-calendar",
            Capability::ExecuteCode => "execute-code",
            Capability::FinancialTransaction => "financial-transaction",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability '{s}'"))
    }
}

/// An ordered set of capabilities.
///
/// Ordered so that missing-capability reasons and stored grants are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    inner: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Grant a capability to this set.
    pub fn grant(&mut self, capability: Capability) {
        self.inner.insert(capability);
    }

    /// Remove a capability from this set. Returns true if it was present.
    pub fn remove(&mut self, capability: &Capability) -> bool {
        self.inner.remove(capability)
    }

    /// Return true if the set contains the given capability.
    pub fn has(&self, capability: &Capability) -> bool {
        self.inner.contains(capability)
    }

    /// Add every capability in `other` to this set.
    pub fn extend(&mut self, other: &CapabilitySet) {
        self.inner.extend(other.inner.iter().copied());
    }

    /// Capabilities in `self` that `other` does not hold.
    pub fn missing_from(&self, other: &CapabilitySet) -> CapabilitySet {
        self.inner.difference(&other.inner).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Return an iterator over all capabilities in order.
    pub fn all(&self) -> impl Iterator<Item = &Capability> {
        self.inner.iter()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.inner.iter().map(Capability::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Restricts a grant to calls against particular targets.
///
/// Patterns are matched against the call's target (e.g. a calendar id):
/// `"*"` matches anything, a trailing `*` matches by prefix, anything else
/// must match exactly. A target with a `..` path segment is only matched by
/// `"*"`, so `/notes/*` never covers `/notes/../etc/shadow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantScope {
    pub targets: Vec<String>,
}

impl GrantScope {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Return true if `target` is covered by this scope.
    ///
    /// A call with no resolvable target is never covered by a scoped grant.
    pub fn permits(&self, target: Option<&str>) -> bool {
        let Some(target) = target else {
            return false;
        };
        let escapes = has_parent_segment(target);
        self.targets.iter().any(|pattern| {
            if pattern == "*" {
                return true;
            }
            if escapes {
                return false;
            }
            match pattern.strip_suffix('*') {
                Some(prefix) => target.starts_with(prefix),
                None => pattern == target,
            }
        })
    }
}

fn has_parent_segment(target: &str) -> bool {
    target.split(['/', '\\']).any(|segment| segment == "..")
}

/// Unique identifier for a stored grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub uuid::Uuid);

impl GrantId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A time- and scope-bounded association of capabilities to a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    pub grant_id: GrantId,
    pub principal: PrincipalId,
    pub capabilities: CapabilitySet,
    /// When present, the grant only covers calls whose target matches.
    pub scope: Option<GrantScope>,
    pub granted_at: DateTime<Utc>,
    /// When present, the grant stops counting at this instant.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CapabilityGrant {
    /// Build a grant issued now with a fresh id.
    pub fn new(
        principal: PrincipalId,
        capabilities: CapabilitySet,
        scope: Option<GrantScope>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            grant_id: GrantId::new(),
            principal,
            capabilities,
            scope,
            granted_at: Utc::now(),
            expires_at,
        }
    }

    /// A grant is expired at or after its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Return true if this grant applies to a call against `target`.
    pub fn covers(&self, target: Option<&str>) -> bool {
        match &self.scope {
            Some(scope) => scope.permits(target),
            None => true,
        }
    }
}
