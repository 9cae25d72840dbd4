//! # toolgate-policy
//!
//! The TOML policy document for the toolgate guard.
//!
//! ## Overview
//!
//! A single document declares every tool (capabilities, reversibility,
//! expected routes, argument schema), the explicit allow/deny list, the
//! route-independent safe tools, and runtime settings. Loading it produces
//! owned parts that are moved into a `SafetyGuard`:
//!
//! - [`DeclarationRegistry`] implements `ToolRegistry`
//! - [`TomlToolPolicy`] implements `ToolPolicy`
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use toolgate_policy::PolicyConfig;
//!
//! let parts = PolicyConfig::from_file(Path::new("policies/assistant.toml"))?.into_parts()?;
//! // Pass `parts.registry` and `parts.policy` to `toolgate_core::SafetyGuard::new(...)`.
//! ```

pub mod config;
pub mod engine;
pub mod registry;

pub use config::{ListSetting, PolicyConfig, PolicyParts, ToolEntry};
pub use engine::TomlToolPolicy;
pub use registry::DeclarationRegistry;

// ── Tests ─────────────────────────────────────────────────────────────────────
