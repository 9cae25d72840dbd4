//! The owned tool registry.

use std::collections::HashMap;

use tracing::debug;

use toolgate_contracts::{
    error::{GateError, GateResult},
    tool::ToolDeclaration,
};
use toolgate_core::traits::ToolRegistry;

/// Tool declarations keyed by name.
///
/// Built once while loading a policy and then moved into the guard; there is
/// no way to add a declaration after that.
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    tools: HashMap<String, ToolDeclaration>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `declaration`. A name may only be registered once.
    pub fn register(&mut self, declaration: ToolDeclaration) -> GateResult<()> {
        if self.tools.contains_key(&declaration.name) {
            return Err(GateError::DuplicateDeclaration {
                tool: declaration.name,
            });
        }
        debug!(
            tool = %declaration.name,
            capabilities = %declaration.capabilities,
            irreversible = declaration.reversibility.is_irreversible(),
            "tool registered"
        );
        self.tools.insert(declaration.name.clone(), declaration);
        Ok(())
    }

    pub fn get(&self, tool_name: &str) -> Option<&ToolDeclaration> {
        self.tools.get(tool_name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every declaration, in no particular order.
    pub fn declarations(&self) -> impl Iterator<Item = &ToolDeclaration> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for DeclarationRegistry {
    fn lookup(&self, tool_name: &str) -> Option<&ToolDeclaration> {
        self.get(tool_name)
    }
}
