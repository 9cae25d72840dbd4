//! # toolgate-core
//!
//! The authorization core that mediates every tool call an agent requests.
//!
//! This crate provides:
//! - The trait seams (`ToolRegistry`, `ToolPolicy`, `GrantStore`, `AuditLog`,
//!   `ArgumentValidator`, `Redactor`)
//! - The `CapabilityGate` and the `ConfirmationLedger`
//! - The `SafetyGuard` that runs them in order and audits every decision
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolgate_core::{SafetyGuard, traits::{ToolRegistry, ToolPolicy, GrantStore, AuditLog}};
//!
//! let guard = SafetyGuard::new(registry, policy, grants, audit, validator, redactor);
//! let decision = guard.authorize(&request);
//! if decision.verdict.is_allow() {
//!     run_tool_body();
//! }
//! ```

pub mod canonical;
pub mod confirm;
pub mod gate;
pub mod guard;
pub mod query;
pub mod traits;

pub use gate::CapabilityGate;
pub use guard::{Decision, GuardConfig, SafetyGuard};
pub use query::AuditQuery;
