//! # toolgate-ref-assistant
//!
//! Personal-assistant reference deployment for the toolgate guard.
//!
//! Wires the TOML policy in `policies/assistant.toml`, a grant store, an
//! audit log, the JSON Schema validator, and the field masker into one
//! `SafetyGuard`, then fronts it with a [`ToolRunner`] that executes mock
//! tool bodies only when the guard allows.
//!
//! Three scenarios exercise the deployment:
//!
//! 1. **Confirmation Flow**: an irreversible `email.send` round trip,
//!    token reuse, argument tampering, and token expiry.
//! 2. **Route Gating**: route-independent safe tools, route mismatch, the
//!    deny list, the allow list, schema violations, and argument masking.
//! 3. **Grant Lifecycle**: scoped grants, expiring grants, purge, revoke.
//!
//! All tool output is fictional. No external systems are contacted.

pub mod deployment;
pub mod runner;
pub mod scenarios;
pub mod tools;

pub use deployment::{assistant_runner, build_guard, in_memory_runner, AuditBackend, ASSISTANT_POLICY};
pub use runner::{RunOutcome, ToolRunner};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Barrier;
    use std::thread;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use toolgate_contracts::{
        audit::AuditFilter,
        capability::{Capability, CapabilitySet, GrantScope},
        principal::{AuthorizationRequest, PrincipalId, Route},
        verdict::{DenyKind, Outcome},
    };
    use toolgate_grants::SqliteGrantStore;

    use super::*;

    fn caps(list: &[Capability]) -> CapabilitySet {
        list.iter().copied().collect()
    }

    fn email_request(principal: &PrincipalId) -> AuthorizationRequest {
        AuthorizationRequest::new(
            principal.clone(),
            Route::new("email"),
            "email.send",
            json!({ "to": "dana@example.com", "subject": "Lunch", "body": "Noon at the usual place?" }),
        )
    }

    // ── 1. Confirmation round trip ───────────────────────────────────────────

    #[test]
    fn email_round_trip_advances_sequence_by_one_per_call() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let guard = runner.guard();
        let alice = PrincipalId::new("alice");
        guard.grant(&alice, caps(&[Capability::SendCommunication]), None, None).unwrap();

        let request = email_request(&alice);
        let pending = match runner.call(&request) {
            RunOutcome::NeedsConfirmation { pending, sequence, .. } => {
                assert_eq!(sequence, 0);
                pending
            }
            other => panic!("expected NeedsConfirmation, got {:?}", other),
        };
        assert_eq!(pending.tool_name, "email.send");

        let token = guard
            .issue_confirmation(&alice, "email.send", &request.arguments)
            .unwrap();
        assert_eq!(token.args_hash, pending.args_hash);

        match runner.call(&request.clone().with_token(token.token_id)) {
            RunOutcome::Completed { output, sequence } => {
                assert_eq!(sequence, 1);
                assert_eq!(output["queued"], true);
            }
            other => panic!("expected Completed, got {:?}", other),
        }

        let reuse = runner.call(&request.with_token(token.token_id));
        assert_eq!(reuse.deny_kind(), Some(DenyKind::ConfirmationInvalid));
        assert_eq!(reuse.sequence(), Some(2));
    }

    #[test]
    fn confirmation_for_reversible_tool_is_refused() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let err = runner
            .guard()
            .issue_confirmation(&PrincipalId::new("alice"), "fs.read", &json!({ "path": "/tmp/x" }))
            .unwrap_err();
        assert_eq!(err.deny_kind(), Some(DenyKind::ConfirmationInvalid));
    }

    #[test]
    fn concurrent_presentations_of_one_token_allow_exactly_once() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let alice = PrincipalId::new("alice");
        runner
            .guard()
            .grant(&alice, caps(&[Capability::SendCommunication]), None, None)
            .unwrap();

        let request = email_request(&alice);
        let token = runner
            .guard()
            .issue_confirmation(&alice, "email.send", &request.arguments)
            .unwrap();
        let request = request.with_token(token.token_id);

        let barrier = Barrier::new(2);
        let outcomes: Vec<RunOutcome> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        runner.call(&request)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let completed = outcomes.iter().filter(|o| o.is_completed()).count();
        let invalid = outcomes
            .iter()
            .filter(|o| o.deny_kind() == Some(DenyKind::ConfirmationInvalid))
            .count();
        assert_eq!((completed, invalid), (1, 1));
        assert!(audit.verify_integrity().unwrap());
    }

    #[test]
    fn token_on_reversible_call_is_not_consumed() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let guard = runner.guard();
        let alice = PrincipalId::new("alice");
        guard
            .grant(
                &alice,
                caps(&[Capability::SendCommunication, Capability::ReadLocalData]),
                None,
                None,
            )
            .unwrap();

        let email = email_request(&alice);
        let token = guard
            .issue_confirmation(&alice, "email.send", &email.arguments)
            .unwrap();

        let read = AuthorizationRequest::new(
            alice.clone(),
            Route::new("files"),
            "fs.read",
            json!({ "path": "/home/user/notes/todo.txt" }),
        )
        .with_token(token.token_id);
        assert!(runner.call(&read).is_completed());

        // The token is still live for the call it was issued for.
        assert!(runner.call(&email.with_token(token.token_id)).is_completed());
    }

    // ── 2. Route and list gating ─────────────────────────────────────────────

    #[test]
    fn time_now_needs_no_grant_under_unknown_route() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let request = AuthorizationRequest::new(
            PrincipalId::new("nobody"),
            Route::unknown(),
            "time.now",
            json!({ "timezone": "Europe/Paris" }),
        );
        match runner.call(&request) {
            RunOutcome::Completed { output, .. } => assert_eq!(output["timezone"], "Europe/Paris"),
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[test]
    fn deny_list_overrides_a_grant_of_everything() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let root = PrincipalId::new("root");
        runner
            .guard()
            .grant(&root, Capability::ALL.into_iter().collect(), None, None)
            .unwrap();

        let outcome = runner.call(&AuthorizationRequest::new(
            root,
            Route::new("shell"),
            "shell.exec",
            json!({ "command": "ls" }),
        ));
        match outcome {
            RunOutcome::Denied { kind, reason, .. } => {
                assert_eq!(kind, DenyKind::DenylistMatch);
                assert!(reason.contains("disabled in this deployment"));
            }
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[test]
    fn sequences_are_gap_free_across_mixed_outcomes() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let bob = PrincipalId::new("bob");
        runner
            .guard()
            .grant(&bob, caps(&[Capability::ReadLocalData]), None, None)
            .unwrap();

        let calls = [
            (Route::new("files"), "fs.read", json!({ "path": "/home/user/notes/todo.txt" })),
            (Route::new("email"), "fs.read", json!({ "path": "/home/user/notes/todo.txt" })),
            (Route::unknown(), "nonexistent.tool", json!({})),
            (Route::new("email"), "email.send", json!({ "to": "x@example.com", "subject": "hi" })),
            (Route::unknown(), "agent.status", json!({})),
        ];
        let sequences: Vec<Option<u64>> = calls
            .into_iter()
            .map(|(route, tool, args)| {
                runner
                    .call(&AuthorizationRequest::new(bob.clone(), route, tool, args))
                    .sequence()
            })
            .collect();
        assert_eq!(sequences, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);

        let entries = audit.entries().unwrap();
        let outcomes: Vec<Outcome> = entries.iter().map(|e| e.record.verdict.outcome()).collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Allow, Outcome::Deny, Outcome::Deny, Outcome::Deny, Outcome::Allow]
        );
        assert!(audit.verify_integrity().unwrap());
    }

    // ── 3. Grants ────────────────────────────────────────────────────────────

    #[test]
    fn revoke_takes_effect_on_the_next_call() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let guard = runner.guard();
        let carol = PrincipalId::new("carol");
        let read = caps(&[Capability::ReadLocalData]);
        guard.grant(&carol, read.clone(), None, None).unwrap();

        let request = AuthorizationRequest::new(
            carol.clone(),
            Route::new("files"),
            "fs.read",
            json!({ "path": "/home/user/notes/todo.txt" }),
        );
        assert!(runner.call(&request).is_completed());

        assert_eq!(guard.revoke(&carol, &read).unwrap(), 1);
        assert_eq!(
            runner.call(&request).deny_kind(),
            Some(DenyKind::InsufficientCapability)
        );
    }

    /// Once `revoke` has returned, no call that starts afterwards is
    /// allowed, even while other calls are in flight.
    #[test]
    fn revoke_linearizes_against_concurrent_calls() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let guard = runner.guard();
        let carol = PrincipalId::new("carol");
        let read = caps(&[Capability::ReadLocalData]);
        guard.grant(&carol, read.clone(), None, None).unwrap();

        let request = AuthorizationRequest::new(
            carol.clone(),
            Route::new("files"),
            "fs.read",
            json!({ "path": "/home/user/notes/todo.txt" }),
        );
        let readers = 4;
        let calls_per_reader = 50;
        let revoked = AtomicBool::new(false);
        let barrier = Barrier::new(readers + 1);

        thread::scope(|s| {
            for _ in 0..readers {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..calls_per_reader {
                        let started_after_revoke = revoked.load(Ordering::SeqCst);
                        let outcome = runner.call(&request);
                        if started_after_revoke {
                            assert_eq!(outcome.deny_kind(), Some(DenyKind::InsufficientCapability));
                        }
                    }
                });
            }
            s.spawn(|| {
                barrier.wait();
                thread::yield_now();
                guard.revoke(&carol, &read).unwrap();
                revoked.store(true, Ordering::SeqCst);
            });
        });

        assert_eq!(
            runner.call(&request).deny_kind(),
            Some(DenyKind::InsufficientCapability)
        );
        assert_eq!(audit.entries().unwrap().len(), readers * calls_per_reader + 1);
        assert!(audit.verify_integrity().unwrap());
    }

    #[test]
    fn path_scope_does_not_cover_parent_traversal() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let ivan = PrincipalId::new("ivan");
        runner
            .guard()
            .grant(
                &ivan,
                caps(&[Capability::ReadLocalData]),
                Some(GrantScope::new(["/home/user/notes/*"])),
                None,
            )
            .unwrap();

        let read = |path: &str| {
            runner.call(&AuthorizationRequest::new(
                ivan.clone(),
                Route::new("files"),
                "fs.read",
                json!({ "path": path }),
            ))
        };
        assert!(read("/home/user/notes/todo.txt").is_completed());
        assert_eq!(
            read("/home/user/notes/../../../etc/shadow").deny_kind(),
            Some(DenyKind::InsufficientCapability)
        );
    }

    #[test]
    fn expired_grant_no_longer_authorizes() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let now = Utc::now();
        let dave = PrincipalId::new("dave");
        runner
            .guard()
            .grant(
                &dave,
                caps(&[Capability::ReadLocalData]),
                None,
                Some(now + Duration::minutes(1)),
            )
            .unwrap();

        let request = AuthorizationRequest::new(
            dave,
            Route::new("files"),
            "fs.read",
            json!({ "path": "/home/user/notes/todo.txt" }),
        );
        assert!(runner.call_at(&request, now).is_completed());
        assert_eq!(
            runner.call_at(&request, now + Duration::minutes(2)).deny_kind(),
            Some(DenyKind::InsufficientCapability)
        );
    }

    // ── 4. Audit content ─────────────────────────────────────────────────────

    #[test]
    fn masked_fields_never_reach_the_audit_log() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let erin = PrincipalId::new("erin");
        runner
            .guard()
            .grant(
                &erin,
                caps(&[Capability::FinancialTransaction, Capability::NetworkEgress]),
                None,
                None,
            )
            .unwrap();

        runner.call(&email_request(&erin));
        runner.call(&AuthorizationRequest::new(
            erin,
            Route::new("payments"),
            "payments.transfer",
            json!({ "to_account": "acct-1", "amount_cents": 500, "card_number": "4000000000000002" }),
        ));

        let entries = audit.entries().unwrap();
        assert_eq!(entries[0].record.arguments["body"], "[REDACTED]");
        assert_eq!(entries[0].record.arguments["subject"], "Lunch");
        assert_eq!(entries[1].record.arguments["card_number"], "[REDACTED]");
        assert_eq!(entries[1].record.arguments["to_account"], "acct-1");
    }

    /// A schema violation on a masked field leaves no trace of its value.
    #[test]
    fn schema_violation_reason_does_not_leak_masked_values() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let judy = PrincipalId::new("judy");

        let outcome = runner.call(&AuthorizationRequest::new(
            judy,
            Route::new("payments"),
            "payments.transfer",
            json!({ "to_account": "acct-9", "amount_cents": 100, "card_number": 4111111111111111u64 }),
        ));
        match &outcome {
            RunOutcome::Denied { kind, reason, .. } => {
                assert_eq!(*kind, DenyKind::SchemaViolation);
                assert!(reason.contains("/card_number"), "reason: {reason}");
            }
            other => panic!("expected Denied, got {:?}", other),
        }

        let entries = audit.entries().unwrap();
        assert_eq!(entries[0].record.arguments["card_number"], "[REDACTED]");
        let stored = serde_json::to_string(&entries[0].record).unwrap();
        assert!(!stored.contains("4111111111111111"), "record: {stored}");
    }

    #[test]
    fn audit_query_filters_by_tool_and_resumes() {
        let audit = AuditBackend::in_memory();
        let runner = in_memory_runner(&audit).unwrap();
        let frank = PrincipalId::new("frank");
        for _ in 0..3 {
            runner.call(&AuthorizationRequest::new(frank.clone(), Route::unknown(), "time.now", json!({})));
            runner.call(&AuthorizationRequest::new(frank.clone(), Route::unknown(), "agent.status", json!({})));
        }

        let mut query = runner.guard().query_audit(AuditFilter::default().tool("time.now"));
        let first = query.next().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        let resume_from = query.last_sequence();

        let rest: Vec<u64> = runner
            .guard()
            .query_audit(AuditFilter {
                after_sequence: resume_from,
                ..AuditFilter::default().tool("time.now")
            })
            .map(|e| e.unwrap().sequence)
            .collect();
        assert_eq!(rest, vec![2, 4]);
    }

    // ── 5. Durable stores ────────────────────────────────────────────────────

    #[test]
    fn sqlite_grants_and_audit_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let grants_path = dir.path().join("grants.db");
        let audit_path = dir.path().join("audit.db");
        let grace = PrincipalId::new("grace");
        let request = AuthorizationRequest::new(
            grace.clone(),
            Route::new("files"),
            "fs.read",
            json!({ "path": "/home/user/notes/todo.txt" }),
        );

        {
            let audit = AuditBackend::sqlite(&audit_path).unwrap();
            let grants = SqliteGrantStore::open(&grants_path).unwrap();
            let runner = assistant_runner(Box::new(grants), &audit).unwrap();
            runner
                .guard()
                .grant(&grace, caps(&[Capability::ReadLocalData]), None, None)
                .unwrap();
            assert_eq!(runner.call(&request).sequence(), Some(0));
        }

        let audit = AuditBackend::sqlite(&audit_path).unwrap();
        let grants = SqliteGrantStore::open(&grants_path).unwrap();
        let runner = assistant_runner(Box::new(grants), &audit).unwrap();
        match runner.call(&request) {
            RunOutcome::Completed { sequence, .. } => assert_eq!(sequence, 1),
            other => panic!("expected Completed, got {:?}", other),
        }
        assert_eq!(audit.entries().unwrap().len(), 2);
        assert!(audit.verify_integrity().unwrap());
    }

    // ── 6. Scenarios ─────────────────────────────────────────────────────────

    #[test]
    fn all_scenarios_share_one_verified_chain() {
        let audit = AuditBackend::in_memory();
        let summaries = scenarios::run_all(&audit).unwrap();

        let names: Vec<&str> = summaries.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["confirmation-flow", "route-gating", "grant-lifecycle"]);

        let total_steps: usize = summaries.iter().map(|s| s.steps.len()).sum();
        assert_eq!(audit.entries().unwrap().len(), total_steps);
        assert!(summaries.iter().all(|s| s.chain_verified));
    }
}
