//! Scenario 3: Grant Lifecycle
//!
//! Demonstrates grants that carry a scope and an expiry, and revocation.
//!
//! Pipeline walk-through for the demo run:
//!   1. Grant modify-calendar scoped to `work-*`, valid for one hour
//!   2. Create an event on `work-team` → ALLOW
//!   3. Create an event on `personal`  → DENY (InsufficientCapability: out of scope)
//!   4. Grant read-local-data for five minutes; read now → ALLOW
//!   5. Same read ten minutes later → DENY (InsufficientCapability: expired)
//!   6. Purge expired grants at that instant → one grant destroyed
//!   7. Revoke modify-calendar; `work-team` again → DENY (InsufficientCapability)

use chrono::{Duration, Utc};
use serde_json::json;

use toolgate_contracts::{
    capability::{Capability, CapabilitySet, GrantScope},
    error::GateResult,
    principal::{AuthorizationRequest, PrincipalId, Route},
};

use crate::{
    deployment::{in_memory_runner, AuditBackend},
    scenarios::ScenarioSummary,
};

/// Run Scenario 3: Grant Lifecycle.
pub fn run_scenario(audit: &AuditBackend) -> GateResult<ScenarioSummary> {
    println!("=== Scenario 3: Grant Lifecycle ===");
    println!();

    let runner = in_memory_runner(audit)?;
    let guard = runner.guard();
    let session = PrincipalId::new("session-planner");
    let now = Utc::now();

    let calendar: CapabilitySet = [Capability::ModifyCalendar].into_iter().collect();
    let event = |calendar_id: &str| {
        AuthorizationRequest::new(
            session.clone(),
            Route::new("calendar"),
            "calendar.create_event",
            json!({ "calendar_id": calendar_id, "title": "Design review", "start": "2026-11-02T10:00:00Z" }),
        )
    };

    let mut summary = ScenarioSummary::new("grant-lifecycle");

    // ── Scoped grant ──────────────────────────────────────────────────────────

    guard.grant(
        &session,
        calendar.clone(),
        Some(GrantScope::new(["work-*"])),
        Some(now + Duration::hours(1)),
    )?;
    println!("  Grant: modify-calendar, scope = [work-*], expires in 1h");

    summary.record("calendar.create_event on work-team", runner.call_at(&event("work-team"), now));
    summary.record("calendar.create_event on personal", runner.call_at(&event("personal"), now));

    // ── Expiring grant ────────────────────────────────────────────────────────

    guard.grant(
        &session,
        [Capability::ReadLocalData].into_iter().collect(),
        None,
        Some(now + Duration::minutes(5)),
    )?;
    println!("  Grant: read-local-data, expires in 5m");

    let read = AuthorizationRequest::new(
        session.clone(),
        Route::new("files"),
        "fs.read",
        json!({ "path": "/home/user/notes/groceries.txt" }),
    );
    let later = now + Duration::minutes(10);
    summary.record("fs.read now", runner.call_at(&read, now));
    summary.record("fs.read ten minutes later", runner.call_at(&read, later));

    let purged = guard.purge_expired_grants_at(later)?;
    println!("  Purged {purged} expired grant(s) as of +10m");

    // ── Revocation ────────────────────────────────────────────────────────────

    let touched = guard.revoke(&session, &calendar)?;
    println!("  Revoked modify-calendar from {touched} grant(s)");
    summary.record(
        "calendar.create_event on work-team after revoke",
        runner.call_at(&event("work-team"), now),
    );

    summary.finish(audit)
}
