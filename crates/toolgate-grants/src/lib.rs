//! # toolgate-grants
//!
//! Capability grant storage for the toolgate guard.
//!
//! Two implementations of `toolgate_core::traits::GrantStore`:
//!
//! - [`InMemoryGrantStore`] for tests and short-lived sessions
//! - [`SqliteGrantStore`] for grants that must survive a restart
//!
//! Both linearize reads against writes: a revoke that has returned is
//! visible to every `active_grants` call that starts after it.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryGrantStore;
pub use sqlite::SqliteGrantStore;

/// Remove `capabilities` from `grant`, returning true if anything changed.
pub(crate) fn strip(
    grant: &mut toolgate_contracts::capability::CapabilityGrant,
    capabilities: &toolgate_contracts::capability::CapabilitySet,
) -> bool {
    let mut changed = false;
    for capability in capabilities.all() {
        changed |= grant.capabilities.remove(capability);
    }
    changed
}
