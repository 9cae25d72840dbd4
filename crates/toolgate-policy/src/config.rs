//! Policy document types and loading.
//!
//! A `PolicyConfig` is deserialized from TOML. It declares every tool the
//! guard will recognise, each tool's allow/deny classification, the fixed
//! set of route-independent safe tools, the confirmation token lifetime, and
//! the argument fields masked before auditing.
//!
//! The document is validated as a whole when loaded: a config that parses
//! but would build an inconsistent registry is rejected up front.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use toolgate_contracts::{
    capability::{Capability, CapabilitySet},
    error::{GateError, GateResult},
    tool::{ListEntry, Reversibility, ToolDeclaration},
};

use crate::{engine::TomlToolPolicy, registry::DeclarationRegistry};

/// Explicit classification of a tool, as written in TOML.
///
/// ```toml
/// list = "allow"
/// list = "deny"
/// list = "unspecified"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListSetting {
    Allow,
    Deny,
    #[default]
    Unspecified,
}

/// One `[[tools]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Registry key, e.g. `"email.send"`.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Capability names in kebab-case, e.g. `"send-communication"`.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Required: there is no safe default for reversibility.
    pub reversible: bool,

    /// Routes the tool may be called from. `"*"` matches any route.
    #[serde(default)]
    pub routes: Vec<String>,

    #[serde(default)]
    pub list: ListSetting,

    /// Written to the audit log when `list = "deny"`.
    pub deny_reason: Option<String>,

    /// Dotted path into the arguments used to check grant scopes.
    pub target_field: Option<String>,

    /// JSON Schema for the arguments. Defaults to "any object".
    pub schema: Option<serde_json::Value>,
}

impl ToolEntry {
    /// Build the guard-facing declaration for this entry.
    pub fn declaration(&self) -> GateResult<ToolDeclaration> {
        let capabilities = self
            .capabilities
            .iter()
            .map(|name| {
                name.parse::<Capability>().map_err(|e| GateError::ConfigError {
                    reason: format!("tool '{}': {}", self.name, e),
                })
            })
            .collect::<GateResult<CapabilitySet>>()?;

        Ok(ToolDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            schema: self
                .schema
                .clone()
                .unwrap_or_else(|| serde_json::json!({ "type": "object" })),
            capabilities,
            reversibility: Reversibility::from_flag(self.reversible),
            expected_routes: self.routes.clone(),
            target_field: self.target_field.clone(),
        })
    }

    pub fn list_entry(&self) -> ListEntry {
        match self.list {
            ListSetting::Allow => ListEntry::Allow,
            ListSetting::Deny => ListEntry::Deny {
                reason: self
                    .deny_reason
                    .clone()
                    .unwrap_or_else(|| format!("tool '{}' is denied by policy", self.name)),
            },
            ListSetting::Unspecified => ListEntry::Unspecified,
        }
    }
}

/// `[confirmation]` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    120
}

/// Upper bound on the confirmation TTL: one day.
pub const MAX_TTL_SECS: u64 = 86_400;

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// `[masking]` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskingSettings {
    /// Argument keys whose values are replaced before auditing.
    #[serde(default)]
    pub fields: Vec<String>,
}

/// The whole policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Read-only introspection tools reachable from any route.
    #[serde(default)]
    pub route_independent: Vec<String>,

    #[serde(default)]
    pub confirmation: ConfirmationSettings,

    #[serde(default)]
    pub masking: MaskingSettings,

    #[serde(default)]
    pub tools: Vec<ToolEntry>,
}

/// The owned pieces a guard is built from.
#[derive(Debug)]
pub struct PolicyParts {
    pub registry: DeclarationRegistry,
    pub policy: TomlToolPolicy,
    pub confirmation_ttl: chrono::Duration,
    pub masked_fields: Vec<String>,
}

impl PolicyConfig {
    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `ConfigError` for malformed TOML, unknown capability names,
    /// an out-of-range TTL, or a bad safe set, and `DuplicateDeclaration` when two
    /// tools share a name.
    pub fn from_toml_str(s: &str) -> GateResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| GateError::ConfigError {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            tools = config.tools.len(),
            safe = config.route_independent.len(),
            "policy loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as a policy document.
    pub fn from_file(path: &Path) -> GateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GateError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check the document for internal consistency.
    pub fn validate(&self) -> GateResult<()> {
        let ttl = self.confirmation.ttl_secs;
        if ttl == 0 || ttl > MAX_TTL_SECS {
            return Err(GateError::ConfigError {
                reason: format!("confirmation.ttl_secs must be between 1 and {MAX_TTL_SECS}, got {ttl}"),
            });
        }

        let registry = self.registry()?;

        for tool in &self.route_independent {
            let Some(decl) = registry.get(tool) else {
                return Err(GateError::ConfigError {
                    reason: format!("route-independent tool '{tool}' is not declared"),
                });
            };
            if decl.reversibility.is_irreversible() {
                return Err(GateError::ConfigError {
                    reason: format!("route-independent tool '{tool}' must be reversible"),
                });
            }
        }

        for entry in &self.tools {
            if entry.deny_reason.is_some() && entry.list != ListSetting::Deny {
                warn!(tool = %entry.name, "deny_reason set on a tool that is not deny-listed");
            }
            if entry.routes.is_empty()
                && entry.list != ListSetting::Allow
                && !self.route_independent.contains(&entry.name)
            {
                warn!(tool = %entry.name, "tool declares no routes and is unreachable");
            }
        }

        Ok(())
    }

    /// Build the tool registry.
    pub fn registry(&self) -> GateResult<DeclarationRegistry> {
        let mut registry = DeclarationRegistry::new();
        for entry in &self.tools {
            registry.register(entry.declaration()?)?;
        }
        Ok(registry)
    }

    /// Build the allow/deny list and safe set.
    pub fn tool_policy(&self) -> TomlToolPolicy {
        TomlToolPolicy::new(
            self.tools
                .iter()
                .map(|entry| (entry.name.clone(), entry.list_entry())),
            self.route_independent.iter().cloned(),
        )
    }

    pub fn confirmation_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.confirmation.ttl_secs.min(MAX_TTL_SECS) as i64)
    }

    /// Split the document into the owned parts a guard consumes.
    pub fn into_parts(self) -> GateResult<PolicyParts> {
        self.validate()?;
        Ok(PolicyParts {
            registry: self.registry()?,
            policy: self.tool_policy(),
            confirmation_ttl: self.confirmation_ttl(),
            masked_fields: self.masking.fields,
        })
    }
}
