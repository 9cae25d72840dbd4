//! Scenario 2: Route Gating
//!
//! Demonstrates the checks that run before any grant is consulted, and the
//! fixed set of route-independent safe tools.
//!
//! Sub-case A: `time.now` under the unknown route, no grants → ALLOW
//! Sub-case B: `agent.status` under an unrelated route        → ALLOW
//! Sub-case C: `fs.read` from the email route                  → DENY (RouteMismatch)
//! Sub-case D: `fs.read` from the files route                  → ALLOW
//! Sub-case E: `shell.exec` with every capability granted      → DENY (DenylistMatch)
//! Sub-case F: allow-listed `web.fetch` under the unknown route → ALLOW
//! Sub-case G: `email.send` missing its subject               → DENY (SchemaViolation)
//! Sub-case H: an undeclared tool                              → DENY (UnknownTool)
//! Sub-case I: `payments.transfer` with a card number          → NEEDS_CONFIRMATION,
//!              and the card number is masked in the audit log

use serde_json::json;

use toolgate_contracts::{
    capability::Capability,
    error::GateResult,
    principal::{AuthorizationRequest, PrincipalId, Route},
};

use crate::{
    deployment::{in_memory_runner, AuditBackend},
    scenarios::ScenarioSummary,
};

/// Run Scenario 2: Route Gating.
pub fn run_scenario(audit: &AuditBackend) -> GateResult<ScenarioSummary> {
    println!("=== Scenario 2: Route Gating ===");
    println!();

    let runner = in_memory_runner(audit)?;
    let guard = runner.guard();
    let session = PrincipalId::new("session-router");
    let call = |route: Route, tool: &str, args: serde_json::Value| {
        runner.call(&AuthorizationRequest::new(session.clone(), route, tool, args))
    };

    let mut summary = ScenarioSummary::new("route-gating");

    // ── Safe tools, before any grant ──────────────────────────────────────────

    println!("  Principal {session} holds no grants yet.");
    summary.record(
        "A: time.now, route=unknown",
        call(Route::unknown(), "time.now", json!({})),
    );
    summary.record(
        "B: agent.status, route=calendar",
        call(Route::new("calendar"), "agent.status", json!({})),
    );

    // ── Every capability granted ──────────────────────────────────────────────

    guard.grant(&session, Capability::ALL.into_iter().collect(), None, None)?;
    println!("  Granted every capability to {session}.");

    summary.record(
        "C: fs.read, route=email",
        call(Route::new("email"), "fs.read", json!({ "path": "/home/user/notes/todo.txt" })),
    );
    summary.record(
        "D: fs.read, route=files",
        call(Route::new("files"), "fs.read", json!({ "path": "/home/user/notes/todo.txt" })),
    );
    summary.record(
        "E: shell.exec, route=shell",
        call(Route::new("shell"), "shell.exec", json!({ "command": "rm -rf ~" })),
    );
    summary.record(
        "F: web.fetch, route=unknown",
        call(Route::unknown(), "web.fetch", json!({ "url": "https://example.com" })),
    );
    summary.record(
        "G: email.send without subject, route=email",
        call(Route::new("email"), "email.send", json!({ "to": "dana@example.com" })),
    );
    summary.record(
        "H: calendar.delete_all, route=calendar",
        call(Route::new("calendar"), "calendar.delete_all", json!({})),
    );
    summary.record(
        "I: payments.transfer, route=payments",
        call(
            Route::new("payments"),
            "payments.transfer",
            json!({ "to_account": "acct-7731", "amount_cents": 12_500, "card_number": "4111111111111111" }),
        ),
    );

    if let Some(entry) = audit.entries()?.last() {
        println!("            audited arguments: {}", entry.record.arguments);
    }

    summary.finish(audit)
}
