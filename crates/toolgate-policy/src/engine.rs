//! Allow/deny list and route-independent safe set.
//!
//! `TomlToolPolicy` implements the `ToolPolicy` trait from toolgate-core.
//! It holds no state beyond what the policy document declared.
//!
//! Classification:
//!
//! 1. A deny entry always wins; the guard checks it before any grant.
//! 2. An allow entry bypasses route matching but not capability coverage.
//! 3. Tools with no entry are `Unspecified` and fall through to routing.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use toolgate_contracts::tool::ListEntry;
use toolgate_core::traits::ToolPolicy;

#[derive(Debug, Default)]
pub struct TomlToolPolicy {
    entries: HashMap<String, ListEntry>,
    route_independent: BTreeSet<String>,
}

impl TomlToolPolicy {
    pub fn new<E, S>(entries: E, route_independent: S) -> Self
    where
        E: IntoIterator<Item = (String, ListEntry)>,
        S: IntoIterator<Item = String>,
    {
        Self {
            entries: entries
                .into_iter()
                .filter(|(_, entry)| *entry != ListEntry::Unspecified)
                .collect(),
            route_independent: route_independent.into_iter().collect(),
        }
    }

    /// The route-independent safe tools, sorted.
    pub fn safe_tools(&self) -> impl Iterator<Item = &str> {
        self.route_independent.iter().map(String::as_str)
    }
}

impl ToolPolicy for TomlToolPolicy {
    fn list_entry(&self, tool_name: &str) -> ListEntry {
        let entry = self.entries.get(tool_name).cloned().unwrap_or_default();
        debug!(tool = %tool_name, entry = ?entry, "list entry resolved");
        entry
    }

    fn is_route_independent(&self, tool_name: &str) -> bool {
        self.route_independent.contains(tool_name)
    }
}
