//! Assistant reference demo scenarios.
//!
//! Each scenario wires a real guard (TOML policy, grant store, audit log,
//! schema validator, field masker) to the mock tool bodies and walks through
//! one enforcement pattern, printing each decision.

use toolgate_contracts::error::GateResult;

use crate::{deployment::AuditBackend, runner::RunOutcome};

pub mod confirmation_flow;
pub mod grant_lifecycle;
pub mod route_gating;

/// What a scenario run observed.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub name: &'static str,
    /// Each call's label and outcome, in order.
    pub steps: Vec<(String, RunOutcome)>,
    pub audit_entries: usize,
    pub chain_verified: bool,
}

impl ScenarioSummary {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            audit_entries: 0,
            chain_verified: false,
        }
    }

    /// Print and keep one outcome.
    fn record(&mut self, label: impl Into<String>, outcome: RunOutcome) -> RunOutcome {
        let label = label.into();
        let sequence = outcome
            .sequence()
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        println!("  [seq {sequence:>3}] {label:<52} {}", outcome.summary());
        match &outcome {
            RunOutcome::Denied { reason, .. } | RunOutcome::NeedsConfirmation { reason, .. } => {
                println!("            reason: {reason}");
            }
            RunOutcome::Completed { output, .. } => {
                println!("            output: {output}");
            }
        }
        self.steps.push((label, outcome.clone()));
        outcome
    }

    /// Close the scenario by checking the audit chain.
    fn finish(mut self, audit: &AuditBackend) -> GateResult<Self> {
        self.audit_entries = audit.entries()?.len();
        self.chain_verified = audit.verify_integrity()?;
        println!();
        println!(
            "  Audit chain integrity:  {} ({} entr{} in log)",
            if self.chain_verified { "VERIFIED" } else { "FAILED" },
            self.audit_entries,
            if self.audit_entries == 1 { "y" } else { "ies" }
        );
        println!();
        Ok(self)
    }
}

/// Run every scenario against one audit backend, in order.
pub fn run_all(audit: &AuditBackend) -> GateResult<Vec<ScenarioSummary>> {
    Ok(vec![
        confirmation_flow::run_scenario(audit)?,
        route_gating::run_scenario(audit)?,
        grant_lifecycle::run_scenario(audit)?,
    ])
}
