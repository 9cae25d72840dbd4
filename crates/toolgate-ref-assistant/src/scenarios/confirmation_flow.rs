//! Scenario 1: Confirmation Flow
//!
//! Demonstrates the round trip every irreversible tool goes through.
//!
//! Pipeline walk-through for the demo run:
//!   1. `email.send` without a token → NEEDS_CONFIRMATION (args hash returned)
//!   2. The user confirms; a token is issued for those exact arguments
//!   3. Same call with the token → ALLOW, the mock body runs
//!   4. Same token again → DENY (ConfirmationInvalid)
//!   5. A fresh token presented with different arguments → DENY (ConfirmationInvalid)
//!   6. A token presented after its TTL → NEEDS_CONFIRMATION again
//!
//! Every call appends exactly one audit entry.

use chrono::{Duration, Utc};
use serde_json::json;

use toolgate_contracts::{
    capability::Capability,
    error::GateResult,
    principal::{AuthorizationRequest, PrincipalId, Route},
};

use crate::{
    deployment::{in_memory_runner, AuditBackend},
    runner::RunOutcome,
    scenarios::ScenarioSummary,
};

/// Run Scenario 1: Confirmation Flow.
pub fn run_scenario(audit: &AuditBackend) -> GateResult<ScenarioSummary> {
    println!("=== Scenario 1: Confirmation Flow ===");
    println!();

    let runner = in_memory_runner(audit)?;
    let guard = runner.guard();
    let session = PrincipalId::new("session-email");

    guard.grant(
        &session,
        [Capability::SendCommunication].into_iter().collect(),
        None,
        None,
    )?;
    println!("  Principal:  {session}");
    println!("  Grant:      send-communication (no scope, no expiry)");
    println!("  Tool:       email.send (irreversible, route = email)");
    println!();

    let args = json!({
        "to": "dana@example.com",
        "subject": "Quarterly report",
        "body": "Attached are the numbers we discussed."
    });
    let request =
        AuthorizationRequest::new(session.clone(), Route::new("email"), "email.send", args.clone());

    let mut summary = ScenarioSummary::new("confirmation-flow");

    // ── Step 1: no token ──────────────────────────────────────────────────────

    let first = summary.record("email.send, no token", runner.call(&request));
    if let RunOutcome::NeedsConfirmation { pending, .. } = &first {
        println!("            pending args hash: {}", pending.args_hash);
    }

    // ── Step 2: the user confirms ─────────────────────────────────────────────

    let token = guard.issue_confirmation(&session, "email.send", &args)?;
    println!("  User confirmed; token {} issued", token.token_id);

    // ── Steps 3-4: use, then reuse ────────────────────────────────────────────

    summary.record(
        "email.send, with token",
        runner.call(&request.clone().with_token(token.token_id)),
    );
    summary.record(
        "email.send, same token again",
        runner.call(&request.clone().with_token(token.token_id)),
    );

    // ── Step 5: token bound to other arguments ────────────────────────────────

    let second = guard.issue_confirmation(&session, "email.send", &args)?;
    let altered = AuthorizationRequest::new(
        session.clone(),
        Route::new("email"),
        "email.send",
        json!({ "to": "mallory@example.com", "subject": "Quarterly report" }),
    )
    .with_token(second.token_id);
    summary.record("email.send, token for other arguments", runner.call(&altered));

    // ── Step 6: expired token ─────────────────────────────────────────────────

    let issued = Utc::now();
    let stale = guard.issue_confirmation_at(&session, "email.send", &args, issued)?;
    let later = issued + guard.confirmation_ttl() + Duration::seconds(1);
    summary.record(
        "email.send, token past its TTL",
        runner.call_at(&request.with_token(stale.token_id), later),
    );

    summary.finish(audit)
}
